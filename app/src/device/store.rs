//! Scoped key-value storage for installation-local values.
//!
//! `FileStore` keeps a flat JSON object in the data directory and rewrites it
//! through a temporary file on every `set`. `MemoryStore` backs tests.

use std::{collections::HashMap, io::ErrorKind, path::PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::{fs, sync::Mutex};
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("Local storage unavailable: {0}")]
    Unavailable(String),

    #[error("Stored value for {key} is corrupt: {reason}")]
    Corrupt { key: String, reason: String },
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn read_all(&self) -> Result<HashMap<String, String>, StorageError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(err) => return Err(StorageError::Unavailable(err.to_string())),
        };

        serde_json::from_str(&raw).map_err(|err| StorageError::Corrupt {
            key: self.path.display().to_string(),
            reason: err.to_string(),
        })
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;

        let mut values = self.read_all().await?;
        values.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| StorageError::Unavailable(err.to_string()))?;
        }

        let body = serde_json::to_string_pretty(&values)
            .map_err(|err| StorageError::Unavailable(err.to_string()))?;
        let staging = self.path.with_extension("json.tmp");

        fs::write(&staging, body)
            .await
            .map_err(|err| StorageError::Unavailable(err.to_string()))?;
        fs::rename(&staging, &self.path)
            .await
            .map_err(|err| StorageError::Unavailable(err.to_string()))?;

        debug!("stored {key} in {}", self.path.display());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    unavailable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every operation fails, as when platform storage is missing.
    pub fn unavailable() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            unavailable: true,
        }
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.unavailable {
            return Err(StorageError::Unavailable("storage disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check()?;
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check()?;
        self.values
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("crown-vote-test-{}", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_file_store_round_trips_and_keeps_other_keys() {
        let dir = scratch_dir();
        let store = FileStore::new(dir.join("nested").join("device.json"));

        assert_eq!(store.get("device_id").await.unwrap(), None);

        store.set("device_id", "abc").await.unwrap();
        store.set("theme", "dark").await.unwrap();

        let reopened = FileStore::new(dir.join("nested").join("device.json"));
        assert_eq!(reopened.get("device_id").await.unwrap().as_deref(), Some("abc"));
        assert_eq!(reopened.get("theme").await.unwrap().as_deref(), Some("dark"));

        fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_reports_corrupt_file() {
        let dir = scratch_dir();
        fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("device.json");
        fs::write(&path, "not json").await.unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(
            store.get("device_id").await,
            Err(StorageError::Corrupt { .. })
        ));

        fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_unavailable_memory_store() {
        let store = MemoryStore::unavailable();
        assert!(store.get("k").await.is_err());
        assert!(store.set("k", "v").await.is_err());
    }
}

//! Device identity provider.
//!
//! Derives a stable pseudo-anonymous identifier for this installation. The
//! first call generates a random UUID v4 and persists it through the injected
//! `KeyValueStore`; later calls return the same value. If storage is
//! unavailable the caller gets an error, never a throwaway identifier.

pub mod store;

use std::sync::Arc;

use adapters::DeviceId;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

pub use store::{FileStore, KeyValueStore, MemoryStore, StorageError};

pub const DEVICE_ID_KEY: &str = "device_id";

pub struct DeviceIdentity {
    store: Arc<dyn KeyValueStore>,
    cached: Mutex<Option<DeviceId>>,
}

impl DeviceIdentity {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            cached: Mutex::new(None),
        }
    }

    pub async fn get_device_id(&self) -> Result<DeviceId, StorageError> {
        // Held across the storage calls so concurrent first calls agree on one identifier.
        let mut cached = self.cached.lock().await;
        if let Some(id) = *cached {
            return Ok(id);
        }

        let id = match self.store.get(DEVICE_ID_KEY).await? {
            Some(raw) => Uuid::parse_str(raw.trim())
                .map(DeviceId)
                .map_err(|err| StorageError::Corrupt {
                    key: DEVICE_ID_KEY.to_string(),
                    reason: err.to_string(),
                })?,
            None => {
                let id = DeviceId(Uuid::new_v4());
                self.store.set(DEVICE_ID_KEY, &id.to_string()).await?;
                info!("Generated new device identifier");
                id
            }
        };

        *cached = Some(id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_repeated_calls_return_same_id() {
        let identity = DeviceIdentity::new(Arc::new(MemoryStore::new()));

        let first = identity.get_device_id().await.unwrap();
        let second = identity.get_device_id().await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_id_survives_restart_with_same_store() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

        let before = DeviceIdentity::new(store.clone()).get_device_id().await.unwrap();
        let after = DeviceIdentity::new(store.clone()).get_device_id().await.unwrap();

        assert_eq!(before, after);
        assert_eq!(
            store.get(DEVICE_ID_KEY).await.unwrap(),
            Some(before.to_string())
        );
    }

    #[tokio::test]
    async fn test_wiped_installation_gets_new_id() {
        let first = DeviceIdentity::new(Arc::new(MemoryStore::new()))
            .get_device_id()
            .await
            .unwrap();
        let fresh = DeviceIdentity::new(Arc::new(MemoryStore::new()))
            .get_device_id()
            .await
            .unwrap();

        assert_ne!(first, fresh);
    }

    #[tokio::test]
    async fn test_unavailable_storage_is_an_error() {
        let identity = DeviceIdentity::new(Arc::new(MemoryStore::unavailable()));

        assert!(matches!(
            identity.get_device_id().await,
            Err(StorageError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_value_is_not_replaced() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store.set(DEVICE_ID_KEY, "not-a-uuid").await.unwrap();

        let identity = DeviceIdentity::new(store.clone());
        assert!(matches!(
            identity.get_device_id().await,
            Err(StorageError::Corrupt { .. })
        ));
        assert_eq!(
            store.get(DEVICE_ID_KEY).await.unwrap().as_deref(),
            Some("not-a-uuid")
        );
    }
}

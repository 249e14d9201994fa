//! Central module for application-wide configuration settings.
//!
//! This module loads the hosted backend location and key, and the local data
//! directory where the device identifier is persisted. Values come from the
//! environment; missing optional values fall back to logged defaults.

use std::{env, path::PathBuf};

use adapters::SupabaseConfig;
use tracing::{info, warn};

use crate::errors::AppError;

pub const URL_VAR: &str = "SUPABASE_URL";
pub const KEY_VAR: &str = "SUPABASE_ANON_KEY";
pub const DATA_DIR_VAR: &str = "CROWN_VOTE_DATA_DIR";

const DEFAULT_DATA_DIR: &str = ".crown-vote";
const DEVICE_FILE: &str = "device.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        Self::from_lookup(var)
    }

    /// Builds the configuration from any key lookup, so tests need not touch the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = lookup(DATA_DIR_VAR).unwrap_or_else(|| {
            info!("{DATA_DIR_VAR} not set, using default: {DEFAULT_DATA_DIR}");
            DEFAULT_DATA_DIR.to_string()
        });

        Self {
            supabase_url: lookup(URL_VAR),
            supabase_anon_key: lookup(KEY_VAR),
            data_dir: PathBuf::from(data_dir),
        }
    }

    /// Logs whether the backend settings are present. The key itself is never logged.
    pub fn log_presence(&self) {
        info!("Backend URL present? {}", self.supabase_url.is_some());
        info!("Backend key present? {}", self.supabase_anon_key.is_some());

        if self.supabase_url.is_none() || self.supabase_anon_key.is_none() {
            warn!("Missing backend settings: set {URL_VAR} and {KEY_VAR}");
        }
    }

    pub fn supabase(&self) -> Result<SupabaseConfig, AppError> {
        let url = self
            .supabase_url
            .clone()
            .ok_or_else(|| AppError::Config(format!("{URL_VAR} is not set")))?;
        let anon_key = self
            .supabase_anon_key
            .clone()
            .ok_or_else(|| AppError::Config(format!("{KEY_VAR} is not set")))?;

        Ok(SupabaseConfig { url, anon_key })
    }

    pub fn device_store_path(&self) -> PathBuf {
        self.data_dir.join(DEVICE_FILE)
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

//! Configuration management for taskboard.
//!
//! Configuration can be set via environment variables:
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `8080`.
//! - `TASKBOARD_STORE` - Optional. Persistence backend: `memory`, `csv`
//!   (alias `file`) or `kv` (alias `remote`). Defaults to `csv`.
//! - `TASKBOARD_CSV_PATH` - Optional. Path of the CSV file for the `csv`
//!   backend. Defaults to `data/tasks.csv`.
//! - `KV_URL` - Optional. Base URL of the key-value server for the `kv`
//!   backend. Defaults to `http://127.0.0.1:8078`.

use std::path::PathBuf;
use thiserror::Error;

use crate::store::StoreKind;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Which persistence backend to use
    pub store: StoreKind,

    /// CSV file path (csv backend only)
    pub csv_path: PathBuf,

    /// Key-value server base URL (kv backend only)
    pub kv_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), e.to_string()))?;

        let store = std::env::var("TASKBOARD_STORE")
            .map(|s| StoreKind::from_str(&s))
            .unwrap_or_default();

        let csv_path = std::env::var("TASKBOARD_CSV_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/tasks.csv"));

        let kv_url =
            std::env::var("KV_URL").unwrap_or_else(|_| "http://127.0.0.1:8078".to_string());

        Ok(Self {
            host,
            port,
            store,
            csv_path,
            kv_url,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            store: StoreKind::default(),
            csv_path: PathBuf::from("data/tasks.csv"),
            kv_url: "http://127.0.0.1:8078".to_string(),
        }
    }
}

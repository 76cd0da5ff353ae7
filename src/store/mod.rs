//! Snapshot persistence with pluggable backends.
//!
//! Supports:
//! - `memory`: no persistence (state lives and dies with the process)
//! - `csv`: single CSV file
//! - `kv`: remote key-value server
//!
//! The engine knows nothing about any of this: it hands out a
//! [`BoardSnapshot`](crate::board::BoardSnapshot) and accepts one back. The
//! HTTP layer saves a snapshot after every successful mutation and restores
//! one at startup.

mod csv;
mod kv;
mod memory;

pub use csv::CsvFileStore;
pub use kv::{KvClient, KvStore};
pub use memory::MemoryStore;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::board::BoardSnapshot;

/// Errors raised by persistence adapters.
///
/// The engine never sees these; adapters surface them to their own callers.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed stored data: {0}")]
    Malformed(String),

    #[error("key-value request failed: {0}")]
    Remote(#[from] reqwest::Error),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Snapshot store trait - implemented by all persistence backends.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// Load the last saved snapshot. Backends report an empty snapshot when
    /// nothing has been saved yet.
    async fn load(&self) -> Result<BoardSnapshot, StoreError>;

    /// Persist a snapshot, replacing whatever was saved before.
    async fn save(&self, snapshot: &BoardSnapshot) -> Result<(), StoreError>;
}

/// Store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    Memory,
    #[default]
    Csv,
    Kv,
}

impl StoreKind {
    /// Parse from a configuration value.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "memory" => Self::Memory,
            "csv" | "file" => Self::Csv,
            "kv" | "remote" => Self::Kv,
            _ => Self::default(),
        }
    }
}

/// Create a snapshot store based on kind and configuration.
pub async fn create_task_store(
    kind: StoreKind,
    csv_path: PathBuf,
    kv_url: &str,
) -> Result<Box<dyn TaskStore>, StoreError> {
    match kind {
        StoreKind::Memory => Ok(Box::new(MemoryStore::new())),
        StoreKind::Csv => Ok(Box::new(CsvFileStore::new(csv_path))),
        StoreKind::Kv => {
            let store = KvStore::connect(kv_url).await?;
            Ok(Box::new(store))
        }
    }
}

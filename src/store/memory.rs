//! Non-persistent store.
//!
//! `save` accepts and discards; `load` reports an empty snapshot. Useful for
//! tests and for running the server without any persistence at all.

use async_trait::async_trait;

use super::{StoreError, TaskStore};
use crate::board::BoardSnapshot;

#[derive(Debug, Default, Clone)]
pub struct MemoryStore;

impl MemoryStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn load(&self) -> Result<BoardSnapshot, StoreError> {
        Ok(BoardSnapshot::default())
    }

    async fn save(&self, _snapshot: &BoardSnapshot) -> Result<(), StoreError> {
        Ok(())
    }
}

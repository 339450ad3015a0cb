//! In-memory reference backend.
//!
//! Holds the buffer state on the heap with no durability boundary.
//! Intended for tests, short-lived processes, and as the executable
//! reference for the buffer contract; none of its operations can fail.

use breccia_types::{BlockId, BufferStats, RecordSeq};
use bytes::Bytes;

use crate::record::LogBlock;
use crate::state::BufferState;
use crate::traits::LogStore;
use crate::StoreError;

/// Infallible buffer backend with no persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: BufferState,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogStore for MemoryStore {
    fn add_record(&mut self, payload: Bytes) -> Result<RecordSeq, StoreError> {
        Ok(self.state.add(payload))
    }

    fn take_block(&mut self, max_bytes: u64) -> Result<Option<LogBlock>, StoreError> {
        Ok(self.state.take_block(max_bytes))
    }

    fn confirm_block(&mut self, id: &BlockId) -> Result<(), StoreError> {
        if let Some(retired) = self.state.confirm(id) {
            tracing::debug!(block_id = %id, records = retired.len(), "confirmed block");
        }
        Ok(())
    }

    fn fail_block(&mut self, id: &BlockId) -> Result<(), StoreError> {
        let requeued = self.state.fail(id);
        if requeued > 0 {
            tracing::debug!(block_id = %id, requeued, "block failed, records returned to pending");
        }
        Ok(())
    }

    fn enforce_max_volume(&mut self, max_volume: u64) -> Result<u64, StoreError> {
        Ok(self.state.evict_to(max_volume))
    }

    fn stats(&self) -> BufferStats {
        self.state.stats()
    }
}

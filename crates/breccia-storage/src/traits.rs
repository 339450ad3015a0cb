//! The backend seam for the log buffer.

use breccia_types::{BlockId, BufferStats, RecordSeq};
use bytes::Bytes;

use crate::record::LogBlock;
use crate::StoreError;

/// The five buffer operations, implemented by each storage backend.
///
/// All operations are total over their valid input domain: unknown block
/// ids are no-ops, an empty pending pool yields no block, and no record
/// content is ever rejected. Errors mean loss of durability or journal
/// damage, nothing else.
///
/// Implementations take `&mut self`; thread safety is layered on top by
/// the `breccia` crate's handle, which serializes all access through one
/// lock.
pub trait LogStore: Send {
    /// Persists a new record into the pending pool, in arrival order.
    ///
    /// Never rejects a payload. A record larger than any block size the
    /// uploader will ever request stays pending until eviction removes it.
    ///
    /// # Errors
    ///
    /// Only a durable backend can fail here, and only when the write that
    /// would make the record durable fails. Such a failure must never be
    /// reported as success.
    fn add_record(&mut self, payload: Bytes) -> Result<RecordSeq, StoreError>;

    /// Forms a delivery block of at most `max_bytes` from pending records.
    ///
    /// Selected records move to in-flight under a fresh block id. Returns
    /// `Ok(None)` when no pending record fits.
    fn take_block(&mut self, max_bytes: u64) -> Result<Option<LogBlock>, StoreError>;

    /// Confirms that a block was durably delivered.
    ///
    /// All surviving members of the block are destroyed and the id is
    /// retired. Unknown or already-retired ids are no-ops, so duplicate
    /// confirmations from a retrying transport are harmless.
    fn confirm_block(&mut self, id: &BlockId) -> Result<(), StoreError>;

    /// Reports that delivery of a block failed.
    ///
    /// Surviving members return to the pending pool in their original
    /// relative order, eligible for re-selection; the id is retired.
    /// Unknown ids are no-ops. Retry scheduling belongs to the uploader.
    fn fail_block(&mut self, id: &BlockId) -> Result<(), StoreError>;

    /// Destroys the oldest records until the volume is at or below
    /// `max_volume` or the buffer is empty. Returns the bytes reclaimed.
    ///
    /// Eviction is oldest-first regardless of pending/in-flight status;
    /// a block whose members are evicted silently shrinks, and a later
    /// confirm or fail for it resolves only the survivors.
    fn enforce_max_volume(&mut self, max_volume: u64) -> Result<u64, StoreError>;

    /// Returns a point-in-time accounting snapshot.
    fn stats(&self) -> BufferStats;

    /// Current volume in bytes of all pending + in-flight records.
    fn volume(&self) -> u64 {
        self.stats().volume_bytes
    }

    /// Number of currently owned records.
    fn record_count(&self) -> usize {
        self.stats().record_count
    }
}

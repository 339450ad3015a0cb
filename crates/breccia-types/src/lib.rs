//! # breccia-types: Core types for `Breccia`
//!
//! This crate contains shared types used across the `Breccia` buffer:
//! - Entity IDs ([`RecordSeq`], [`BlockId`])
//! - Status reporting ([`BufferStats`])

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Entity IDs
// ============================================================================

/// Arrival-order sequence number of a buffered record.
///
/// Sequence numbers are assigned monotonically at ingestion time and are
/// never reused, even after the record they name has been confirmed or
/// evicted. They double as the arena key for the record store, so iterating
/// records by sequence number is iterating them in arrival order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct RecordSeq(u64);

impl RecordSeq {
    pub const ZERO: RecordSeq = RecordSeq(0);

    pub fn new(seq: u64) -> Self {
        Self(seq)
    }

    /// Returns the sequence number as a `u64`.
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns the sequence number that follows this one.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl Display for RecordSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RecordSeq {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<RecordSeq> for u64 {
    fn from(seq: RecordSeq) -> Self {
        seq.0
    }
}

/// Unique identifier for a delivery block.
///
/// Assigned by the buffer when a block is formed. A block id stays valid
/// until the block is confirmed or reported failed; ids are random UUIDs,
/// so an id is never reactivated after retirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(Uuid);

impl BlockId {
    /// Generates a fresh block id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a block id from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for BlockId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<BlockId> for Uuid {
    fn from(id: BlockId) -> Self {
        id.0
    }
}

// ============================================================================
// Status Reporting
// ============================================================================

/// Point-in-time accounting snapshot of a buffer.
///
/// `volume_bytes` always equals the summed sizes of all pending plus
/// in-flight records; upload strategies use it to decide when to form
/// blocks and when to trigger eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BufferStats {
    /// Total size in bytes of all currently owned records.
    pub volume_bytes: u64,
    /// Number of currently owned records (pending + in-flight).
    pub record_count: usize,
    /// Records not yet assigned to any outstanding block.
    pub pending_records: usize,
    /// Records currently assigned to an outstanding block.
    pub in_flight_records: usize,
    /// Number of outstanding (unconfirmed, unfailed) blocks.
    pub in_flight_blocks: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_seq_ordering_follows_arrival() {
        let a = RecordSeq::new(1);
        let b = a.next();
        assert!(a < b);
        assert_eq!(b.as_u64(), 2);
    }

    #[test]
    fn record_seq_u64_roundtrip() {
        let seq = RecordSeq::from(42u64);
        assert_eq!(u64::from(seq), 42);
        assert_eq!(seq.to_string(), "42");
    }

    #[test]
    fn block_ids_are_unique() {
        let a = BlockId::generate();
        let b = BlockId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn block_id_uuid_roundtrip() {
        let id = BlockId::generate();
        assert_eq!(BlockId::from_uuid(id.as_uuid()), id);
    }
}

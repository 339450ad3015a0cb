//! Record and block types for the log buffer.
//!
//! A [`LogRecord`] is one opaque telemetry payload with a derived byte
//! size. A [`LogBlock`] is an immutable, size-bounded grouping of records
//! offered to the uploader for delivery. Blocks are snapshots: the buffer
//! keeps ownership of every member record until the block id is confirmed
//! or reported failed, and payloads are shared by reference count rather
//! than copied.

use breccia_types::BlockId;
use bytes::Bytes;

/// A single buffered telemetry record.
///
/// The payload is opaque to the buffer; only its size participates in
/// block formation and volume accounting. Records are never split across
/// blocks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogRecord {
    payload: Bytes,
}

impl LogRecord {
    /// Creates a record from an opaque payload.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Returns the payload of this record.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Returns the size cost of this record in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.payload.len() as u64
    }
}

/// An immutable snapshot of records selected for one delivery attempt.
///
/// `total_size` is the sum of member sizes, fixed at formation time and
/// never recomputed — even if members are later evicted under volume
/// pressure, the block the uploader holds does not change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogBlock {
    id: BlockId,
    records: Vec<LogRecord>,
    total_size: u64,
}

impl LogBlock {
    pub(crate) fn new(id: BlockId, records: Vec<LogRecord>, total_size: u64) -> Self {
        // Invariant: total_size equals the sum of member sizes at formation
        debug_assert_eq!(
            records.iter().map(LogRecord::size_bytes).sum::<u64>(),
            total_size,
            "block total_size must match summed member sizes"
        );
        Self {
            id,
            records,
            total_size,
        }
    }

    /// Returns the unique id of this block.
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// Returns the member records in their arrival order.
    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Returns the summed size of all member records in bytes.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Returns the number of member records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the block has no members.
    ///
    /// Never true for blocks produced by the buffer; an empty selection
    /// yields no block at all.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

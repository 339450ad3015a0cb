//! # breccia-storage: Log buffer storage for `Breccia`
//!
//! This crate implements the record buffer that sits between a telemetry
//! producer and the network uploader:
//! - [`LogRecord`] / [`LogBlock`]: opaque payloads and the size-bounded
//!   blocks formed from them for delivery
//! - [`LogStore`]: the five buffer operations (ingest, form block, confirm,
//!   report failure, enforce volume) behind a backend seam
//! - [`MemoryStore`]: infallible in-memory reference backend
//! - [`JournalStore`]: durable backend over an append-only journal file
//!   with CRC-checked entries, tail truncation on torn writes, and
//!   compaction of retired entries

mod compaction;
mod entry;
mod journal;
mod memory;
mod record;
mod state;
mod traits;


pub use compaction::{CompactionConfig, CompactionResult};
pub use journal::{JournalOptions, JournalStore};
pub use memory::MemoryStore;
pub use record::{LogBlock, LogRecord};
pub use traits::LogStore;

/// Errors surfaced by the storage backends.
///
/// The buffer operations are total over their valid input domain: unknown
/// block ids and empty pending pools are not errors. What remains is loss
/// of durability (journal I/O) and journal damage discovered during replay.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("filesystem error")]
    Io(#[from] std::io::Error),
    #[error("unexpected end of journal")]
    UnexpectedEof,
    #[error("corrupted journal entry: CRC mismatch")]
    CorruptedEntry,
    #[error("torn write: {reason}")]
    TornWrite { reason: String },
    #[error("invalid journal entry kind: {byte:#04x}")]
    InvalidEntryKind { byte: u8 },
    #[error("invalid journal header: {reason}")]
    InvalidHeader { reason: String },
}

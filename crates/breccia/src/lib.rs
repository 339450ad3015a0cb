//! # Breccia
//!
//! Client-side durable log buffer for telemetry delivery.
//!
//! Breccia sits between an application producing telemetry records and the
//! uploader that ships them to a remote collector. Records are persisted
//! as they arrive, grouped into size-bounded blocks on demand, retired
//! once a block is confirmed delivered, requeued when delivery fails, and
//! evicted oldest-first when storage exceeds a configured volume.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐  add_record   ┌───────────────────────┐  take_block    ┌──────────┐
//! │ producer │ ────────────▶ │       LogBuffer       │ ─────────────▶ │ uploader │
//! └──────────┘               │  pending │ in-flight  │ ◀───────────── └──────────┘
//!                            │    volume counter     │  confirm/fail
//! ┌──────────┐  enforce_max_ │                       │
//! │ capacity │ ────────────▶ │  MemoryStore          │
//! │ monitor  │    volume     │  JournalStore (disk)  │
//! └──────────┘               └───────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use breccia::LogBuffer;
//!
//! // Open a durable buffer (journal replayed if it already exists)
//! let buffer = LogBuffer::open(".breccia/data/buffer.journal")?;
//!
//! // Producer side
//! buffer.add_record(&b"event payload"[..])?;
//!
//! // Uploader side
//! if let Some(block) = buffer.take_block(512 * 1024)? {
//!     match send_to_collector(&block) {
//!         Ok(()) => buffer.confirm_block(&block.id())?,
//!         Err(_) => buffer.fail_block(&block.id())?,
//!     }
//! }
//!
//! // Capacity monitor side
//! buffer.enforce_max_volume(16 * 1024 * 1024)?;
//! ```

mod buffer;
mod error;

#[cfg(test)]
mod tests;

pub use buffer::LogBuffer;
pub use error::{BufferError, Result};

// Re-export core types from breccia-types
pub use breccia_types::{BlockId, BufferStats, RecordSeq};

// Re-export storage types
pub use breccia_storage::{
    CompactionConfig, CompactionResult, JournalOptions, JournalStore, LogBlock, LogRecord,
    LogStore, MemoryStore, StoreError,
};

// Re-export configuration
pub use breccia_config::{BufferConfig, ConfigError, ConfigLoader, Paths};

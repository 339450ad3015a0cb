//! The shared buffer handle.
//!
//! [`LogBuffer`] is what the collaborating parties hold: the telemetry
//! producer pushes records through it, the uploader forms and resolves
//! blocks through it, and the capacity monitor enforces the volume ceiling
//! through it. Handles are cheap clones of one underlying store guarded by
//! a single lock, so the partition and the volume counter can never be
//! observed or modified inconsistently — there is no ambient singleton,
//! only explicitly shared handles.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use breccia_config::BufferConfig;
use breccia_storage::{
    CompactionConfig, CompactionResult, JournalOptions, JournalStore, LogBlock, LogStore,
    MemoryStore,
};
use breccia_types::{BlockId, BufferStats, RecordSeq};
use bytes::Bytes;

use crate::error::{BufferError, Result};

/// Thread-safe handle to one log buffer instance.
///
/// All five buffer operations take `&self` and may be called from
/// producer, uploader, and capacity-monitor threads concurrently; every
/// call serializes on the same mutex. None of the operations block beyond
/// that lock, and formation/eviction run in time proportional to the
/// records they inspect.
pub struct LogBuffer<S = JournalStore> {
    inner: Arc<Mutex<S>>,
    /// Warn at ingestion above this size; zero disables the check.
    oversize_warn_bytes: u64,
}

impl<S> Clone for LogBuffer<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            oversize_warn_bytes: self.oversize_warn_bytes,
        }
    }
}

impl LogBuffer<MemoryStore> {
    /// Creates a buffer with no durability boundary.
    ///
    /// Suitable for tests and for callers that accept losing buffered
    /// records on process exit.
    pub fn in_memory() -> Self {
        Self::with_store(MemoryStore::new())
    }
}

impl LogBuffer<JournalStore> {
    /// Opens (or creates) a journal-backed buffer at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let store = JournalStore::open(path.as_ref())?;
        Ok(Self::with_store(store))
    }

    /// Opens a journal-backed buffer from a loaded configuration.
    pub fn open_with_config(config: &BufferConfig) -> Result<Self> {
        let options = JournalOptions {
            fsync_on_append: config.storage.fsync_on_append,
            compaction: CompactionConfig {
                min_file_bytes: config.compaction.min_file_bytes,
                dead_ratio: config.compaction.dead_ratio,
            },
        };
        let store = JournalStore::open_with(config.journal_path(), options)?;
        Ok(Self::with_store(store)
            .with_oversize_warn(config.limits.effective_oversize_warn_bytes()))
    }

    /// Rewrites the journal without its retired entries.
    pub fn compact(&self) -> Result<CompactionResult> {
        Ok(self.lock()?.compact()?)
    }
}

impl<S: LogStore> LogBuffer<S> {
    /// Wraps an already-constructed backend in a shareable handle.
    pub fn with_store(store: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
            oversize_warn_bytes: 0,
        }
    }

    /// Sets the ingestion size above which a record is flagged as unable
    /// to fit a default-sized block. Zero disables the check.
    pub fn with_oversize_warn(mut self, bytes: u64) -> Self {
        self.oversize_warn_bytes = bytes;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, S>> {
        self.inner.lock().map_err(|_| BufferError::LockPoisoned)
    }

    /// Persists a new record into the pending pool, in arrival order.
    ///
    /// Accepts any payload; a record too large for the configured block
    /// size is still stored and logged, since it can only leave the buffer
    /// through eviction or an unusually large block request.
    pub fn add_record(&self, payload: impl Into<Bytes>) -> Result<RecordSeq> {
        let payload = payload.into();
        if self.oversize_warn_bytes > 0 && payload.len() as u64 > self.oversize_warn_bytes {
            tracing::warn!(
                size = payload.len(),
                threshold = self.oversize_warn_bytes,
                "record exceeds the block size and will sit pending until evicted"
            );
        }
        Ok(self.lock()?.add_record(payload)?)
    }

    /// Forms a delivery block of at most `max_bytes` from pending records,
    /// or returns `None` when nothing fits.
    pub fn take_block(&self, max_bytes: u64) -> Result<Option<LogBlock>> {
        Ok(self.lock()?.take_block(max_bytes)?)
    }

    /// Confirms that a block was durably delivered; duplicate and unknown
    /// ids are no-ops.
    pub fn confirm_block(&self, id: &BlockId) -> Result<()> {
        Ok(self.lock()?.confirm_block(id)?)
    }

    /// Reports a failed delivery; the block's surviving records return to
    /// the pending pool for re-selection.
    pub fn fail_block(&self, id: &BlockId) -> Result<()> {
        Ok(self.lock()?.fail_block(id)?)
    }

    /// Destroys the oldest records until the volume is at or below
    /// `max_volume`. Returns the bytes reclaimed.
    pub fn enforce_max_volume(&self, max_volume: u64) -> Result<u64> {
        Ok(self.lock()?.enforce_max_volume(max_volume)?)
    }

    /// Returns a point-in-time accounting snapshot.
    pub fn stats(&self) -> Result<BufferStats> {
        Ok(self.lock()?.stats())
    }

    /// Current volume in bytes of all pending + in-flight records.
    pub fn volume(&self) -> Result<u64> {
        Ok(self.lock()?.volume())
    }

    /// Number of currently owned records.
    pub fn record_count(&self) -> Result<usize> {
        Ok(self.lock()?.record_count())
    }
}

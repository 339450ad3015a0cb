//! Durable journal-backed buffer store.
//!
//! The [`JournalStore`] keeps the buffer state in memory and mirrors every
//! durable fact into a single append-only journal file: one `Ingest` entry
//! per record added, one `Retire` entry per record confirmed or evicted.
//! Opening the store replays the journal to rebuild the pending set and
//! the volume counter.
//!
//! Block membership is deliberately not journaled. In-flight state is
//! volatile: after a reopen every unacknowledged record is pending again
//! and will be selected into a fresh block. Unacknowledged data therefore
//! survives any crash; what a crash can cause is re-delivery of records
//! whose confirmation never reached the journal.
//!
//! # File Layout
//!
//! ```text
//! {path}              <- header + append-only entries (see entry module)
//! {path}.compact      <- compaction scratch file, atomically renamed over {path}
//! ```
//!
//! # Recovery
//!
//! Replay stops at the first entry that fails to parse; the file is
//! truncated back to the last complete entry. Entries cannot be re-framed
//! past a damaged one, so everything after it is discarded — with
//! fsync-per-append this is only ever a torn tail from power loss.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use breccia_types::{BlockId, BufferStats, RecordSeq};
use bytes::Bytes;

use crate::compaction::{CompactionConfig, CompactionResult};
use crate::entry::{self, ENTRY_OVERHEAD, EntryKind, JOURNAL_HEADER_SIZE, JournalEntry};
use crate::record::LogBlock;
use crate::state::BufferState;
use crate::traits::LogStore;
use crate::StoreError;

/// Tunables for a [`JournalStore`].
#[derive(Debug, Clone)]
pub struct JournalOptions {
    /// Whether to fsync the journal after every mutating operation.
    ///
    /// Disabling this trades the durability of the most recent writes for
    /// throughput; the journal stays consistent either way.
    pub fsync_on_append: bool,
    /// When to rewrite the journal without its retired entries.
    pub compaction: CompactionConfig,
}

impl Default for JournalOptions {
    fn default() -> Self {
        Self {
            fsync_on_append: true,
            compaction: CompactionConfig::default(),
        }
    }
}

/// Buffer backend whose record ownership and volume accounting survive
/// process restarts via an append-only journal file.
#[derive(Debug)]
pub struct JournalStore {
    path: PathBuf,
    file: File,
    state: BufferState,
    options: JournalOptions,
    /// Size of the journal file in bytes.
    file_len: u64,
    /// Number of entries currently in the journal file.
    entry_count: usize,
}

impl JournalStore {
    /// Opens (or creates) a journal at the given path with default options.
    ///
    /// Existing entries are replayed to rebuild the pending set; records
    /// that were in flight when the previous process stopped come back as
    /// pending.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::open_with(path, JournalOptions::default())
    }

    /// Opens (or creates) a journal with explicit options.
    pub fn open_with(path: impl Into<PathBuf>, options: JournalOptions) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        let data: Bytes = fs::read(&path)?.into();

        let mut state = BufferState::new();
        let mut entry_count: usize = 0;
        let mut file_len = data.len() as u64;

        if data.len() < JOURNAL_HEADER_SIZE {
            // Empty file, or a header torn by a crash before any entry
            // could have been written. Start fresh.
            if !data.is_empty() {
                tracing::warn!(
                    path = %path.display(),
                    len = data.len(),
                    "journal shorter than its header, starting fresh"
                );
                file.set_len(0)?;
            }
            let mut header = Vec::with_capacity(JOURNAL_HEADER_SIZE);
            entry::write_header(&mut header);
            file.write_all(&header)?;
            file.sync_all()?;
            file_len = JOURNAL_HEADER_SIZE as u64;
        } else {
            entry::check_header(&data)?;

            let mut pos = JOURNAL_HEADER_SIZE;
            while pos < data.len() {
                match JournalEntry::from_bytes(&data.slice(pos..)) {
                    Ok((parsed, consumed)) => {
                        match parsed.kind() {
                            EntryKind::Ingest => {
                                state.restore(parsed.seq(), parsed.payload().clone());
                            }
                            EntryKind::Retire => {
                                let _ = state.retire(parsed.seq());
                            }
                        }
                        entry_count += 1;
                        pos += consumed;
                    }
                    Err(error) => {
                        tracing::warn!(
                            path = %path.display(),
                            position = pos,
                            %error,
                            "journal tail unreadable, truncating to last complete entry"
                        );
                        file.set_len(pos as u64)?;
                        file.sync_all()?;
                        file_len = pos as u64;
                        break;
                    }
                }
            }
        }

        tracing::info!(
            path = %path.display(),
            records = state.record_count(),
            volume = state.volume(),
            "opened journal"
        );

        Ok(Self {
            path,
            file,
            state,
            options,
            file_len,
            entry_count,
        })
    }

    /// Returns the journal file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a batch of entries, syncing once if configured to.
    fn append_entries(&mut self, entries: &[JournalEntry]) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut buf = Vec::new();
        for entry in entries {
            entry.write_into(&mut buf);
        }
        self.file.write_all(&buf)?;
        if self.options.fsync_on_append {
            self.file.sync_all()?;
        }
        self.file_len += buf.len() as u64;
        self.entry_count += entries.len();
        Ok(())
    }

    /// Journal bytes that would survive a compaction pass.
    fn live_bytes(&self) -> u64 {
        JOURNAL_HEADER_SIZE as u64
            + self.state.record_count() as u64 * ENTRY_OVERHEAD as u64
            + self.state.volume()
    }

    fn should_compact(&self) -> bool {
        if self.file_len < self.options.compaction.min_file_bytes {
            return false;
        }
        let dead = self.file_len.saturating_sub(self.live_bytes());
        dead as f64 >= self.file_len as f64 * self.options.compaction.dead_ratio
    }

    fn maybe_compact(&mut self) -> Result<(), StoreError> {
        if self.should_compact() {
            self.compact()?;
        }
        Ok(())
    }

    /// Rewrites the journal with only the live records and atomically
    /// swaps it into place.
    ///
    /// Runs opportunistically after retire-heavy operations once the dead
    /// byte ratio crosses the configured threshold; calling it explicitly
    /// is always safe.
    pub fn compact(&mut self) -> Result<CompactionResult, StoreError> {
        let entries_before = self.entry_count;
        let old_len = self.file_len;

        let scratch_path = {
            let mut p = self.path.as_os_str().to_owned();
            p.push(".compact");
            PathBuf::from(p)
        };

        let mut buf = Vec::with_capacity(self.live_bytes() as usize);
        entry::write_header(&mut buf);
        for (seq, record) in self.state.iter() {
            JournalEntry::ingest(seq, record.payload().clone()).write_into(&mut buf);
        }

        let mut scratch = File::create(&scratch_path)?;
        scratch.write_all(&buf)?;
        scratch.sync_all()?;
        drop(scratch);

        fs::rename(&scratch_path, &self.path)?;

        // The old append handle points at the unlinked file; reopen.
        self.file = OpenOptions::new().append(true).open(&self.path)?;
        self.file_len = buf.len() as u64;
        self.entry_count = self.state.record_count();

        let result = CompactionResult {
            entries_before,
            entries_after: self.entry_count,
            bytes_reclaimed: old_len.saturating_sub(self.file_len),
        };

        tracing::info!(
            path = %self.path.display(),
            entries_before = result.entries_before,
            entries_after = result.entries_after,
            bytes_reclaimed = result.bytes_reclaimed,
            "compacted journal"
        );

        Ok(result)
    }
}

impl LogStore for JournalStore {
    fn add_record(&mut self, payload: Bytes) -> Result<RecordSeq, StoreError> {
        // Journal first: the record is only acknowledged to the producer
        // once the ingest entry is on disk.
        let seq = self.state.next_seq();
        let entry = JournalEntry::ingest(seq, payload.clone());
        self.append_entries(std::slice::from_ref(&entry))?;

        let assigned = self.state.add(payload);
        debug_assert_eq!(assigned, seq);
        Ok(seq)
    }

    fn take_block(&mut self, max_bytes: u64) -> Result<Option<LogBlock>, StoreError> {
        let block = self.state.take_block(max_bytes);
        if let Some(block) = &block {
            tracing::debug!(
                block_id = %block.id(),
                records = block.len(),
                total_size = block.total_size(),
                "formed block"
            );
        }
        Ok(block)
    }

    fn confirm_block(&mut self, id: &BlockId) -> Result<(), StoreError> {
        // Unknown or already-retired id: duplicate confirmation, no-op.
        let Some(live) = self.state.live_members(id) else {
            return Ok(());
        };

        // Journal the retirements before forgetting the records, so a
        // confirmed record can never resurrect on replay.
        let entries: Vec<JournalEntry> =
            live.iter().map(|&seq| JournalEntry::retire(seq)).collect();
        self.append_entries(&entries)?;

        let retired = self
            .state
            .confirm(id)
            .expect("block observed outstanding above");
        debug_assert_eq!(retired, live);

        tracing::debug!(block_id = %id, records = retired.len(), "confirmed block");
        self.maybe_compact()?;
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
        let (victims, reclaimed) = self.state.eviction_plan(max_volume);
        if victims.is_empty() {
            return Ok(0);
        }

        let entries: Vec<JournalEntry> = victims
            .iter()
            .map(|&seq| JournalEntry::retire(seq))
            .collect();
        self.append_entries(&entries)?;

        for seq in victims {
            self.state
                .retire(seq)
                .expect("eviction victim exists in arena");
        }

        tracing::debug!(
            evicted = entries.len(),
            reclaimed,
            "evicted oldest records to enforce volume limit"
        );
        self.maybe_compact()?;
        Ok(reclaimed)
    }

    fn stats(&self) -> BufferStats {
        self.state.stats()
    }
}

impl Drop for JournalStore {
    fn drop(&mut self) {
        if !self.options.fsync_on_append {
            if let Err(error) = self.file.sync_all() {
                tracing::error!(%error, "failed to sync journal during drop");
            }
        }
    }
}

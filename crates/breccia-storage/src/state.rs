//! Pending/in-flight partition and volume accounting.
//!
//! [`BufferState`] is the pure core of the buffer: it owns the record
//! arena, the block side table, and the volume counter, and performs every
//! state transition without touching I/O. The storage backends are thin
//! shells around it — [`MemoryStore`](crate::MemoryStore) adds nothing,
//! [`JournalStore`](crate::JournalStore) adds the durability boundary.
//!
//! # State machine
//!
//! ```text
//! pending ──take_block──▶ in-flight ──confirm──▶ removed
//!    ▲                        │
//!    └────────fail────────────┤
//!                             ▼
//! pending/in-flight ──evict──▶ evicted
//! ```
//!
//! `removed` and `evicted` are terminal. No other transitions exist.
//!
//! # Invariants
//!
//! - A record belongs to at most one outstanding block at a time
//!   (`bound` marks exactly the live records named by `in_flight`)
//! - `volume` equals the summed sizes of all records in the arena
//! - Sequence numbers are assigned monotonically and never reused

use std::collections::{BTreeMap, HashMap, HashSet};

use breccia_types::{BlockId, BufferStats, RecordSeq};
use bytes::Bytes;

use crate::record::{LogBlock, LogRecord};

/// The ordered record arena and its partition into pending and in-flight.
///
/// Records are keyed by arrival sequence in a `BTreeMap`, so iteration is
/// arrival order — block formation and eviction both walk the same
/// ordering. The side table maps each outstanding block id to its member
/// sequences; `bound` is the set of live in-flight sequences, making the
/// pending set "in arena and not bound".
#[derive(Debug, Default)]
pub(crate) struct BufferState {
    /// Arrival-ordered arena of owned records.
    records: BTreeMap<RecordSeq, LogRecord>,
    /// Outstanding block id → member sequences (in selection order).
    in_flight: HashMap<BlockId, Vec<RecordSeq>>,
    /// Live records currently bound to an outstanding block.
    bound: HashSet<RecordSeq>,
    /// Summed sizes of all records in the arena.
    volume: u64,
    /// Next sequence to assign at ingestion.
    next_seq: RecordSeq,
}

impl BufferState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the sequence the next ingested record will receive.
    pub(crate) fn next_seq(&self) -> RecordSeq {
        self.next_seq
    }

    /// Ingests a payload at the next sequence, in arrival order.
    ///
    /// Never rejects a payload: an oversized record is accepted and simply
    /// becomes an early eviction candidate.
    pub(crate) fn add(&mut self, payload: Bytes) -> RecordSeq {
        let seq = self.next_seq;
        let record = LogRecord::new(payload);
        self.volume += record.size_bytes();
        self.records.insert(seq, record);
        self.next_seq = seq.next();
        seq
    }

    /// Re-inserts a record at an explicit sequence during journal replay.
    pub(crate) fn restore(&mut self, seq: RecordSeq, payload: Bytes) {
        let record = LogRecord::new(payload);
        self.volume += record.size_bytes();
        let prev = self.records.insert(seq, record);
        debug_assert!(prev.is_none(), "duplicate sequence {seq} in replay");
        if seq >= self.next_seq {
            self.next_seq = seq.next();
        }
    }

    /// Removes a record from the arena, whatever its state.
    ///
    /// Returns the record's size, or `None` if the sequence is not owned.
    pub(crate) fn retire(&mut self, seq: RecordSeq) -> Option<u64> {
        let record = self.records.remove(&seq)?;
        let size = record.size_bytes();
        debug_assert!(self.volume >= size, "volume underflow retiring {seq}");
        self.volume -= size;
        self.bound.remove(&seq);
        Some(size)
    }

    /// Forms a delivery block of at most `max_bytes` from the pending set.
    ///
    /// Walks pending records in arrival order, accumulating sizes, and
    /// stops before the record that would push the total over `max_bytes`.
    /// Nothing past the stopping point is considered; records are atomic
    /// and never split. Returns `None` when no pending record fits —
    /// including when the oldest pending record alone exceeds `max_bytes`,
    /// which leaves that record pending rather than dropping it.
    pub(crate) fn take_block(&mut self, max_bytes: u64) -> Option<LogBlock> {
        let mut selected: Vec<RecordSeq> = Vec::new();
        let mut total: u64 = 0;

        for (&seq, record) in &self.records {
            if self.bound.contains(&seq) {
                continue;
            }
            if total + record.size_bytes() > max_bytes {
                break;
            }
            total += record.size_bytes();
            selected.push(seq);
        }

        if selected.is_empty() {
            return None;
        }

        let id = BlockId::generate();
        let members = selected
            .iter()
            .map(|seq| self.records[seq].clone())
            .collect();
        for &seq in &selected {
            self.bound.insert(seq);
        }
        self.in_flight.insert(id, selected);

        Some(LogBlock::new(id, members, total))
    }

    /// Returns the still-live members of an outstanding block, in order.
    ///
    /// `None` if the id is unknown or already resolved. Members evicted
    /// since formation are absent from the result.
    pub(crate) fn live_members(&self, id: &BlockId) -> Option<Vec<RecordSeq>> {
        let members = self.in_flight.get(id)?;
        Some(
            members
                .iter()
                .copied()
                .filter(|seq| self.records.contains_key(seq))
                .collect(),
        )
    }

    /// Resolves a block as delivered: destroys its surviving members.
    ///
    /// Returns the retired sequences, or `None` if the id is unknown or
    /// already resolved (duplicate confirmations are no-ops).
    pub(crate) fn confirm(&mut self, id: &BlockId) -> Option<Vec<RecordSeq>> {
        let members = self.in_flight.remove(id)?;
        let mut retired = Vec::with_capacity(members.len());
        for seq in members {
            if self.retire(seq).is_some() {
                retired.push(seq);
            }
        }
        Some(retired)
    }

    /// Resolves a block as failed: its surviving members return to pending.
    ///
    /// Members keep their original arrival order — the pending walk is by
    /// sequence, so no reordering is possible. Returns the number of
    /// records returned to the pending pool (zero for unknown ids).
    pub(crate) fn fail(&mut self, id: &BlockId) -> usize {
        let Some(members) = self.in_flight.remove(id) else {
            return 0;
        };
        let mut requeued = 0;
        for seq in members {
            if self.bound.remove(&seq) {
                debug_assert!(self.records.contains_key(&seq));
                requeued += 1;
            }
        }
        requeued
    }

    /// Selects the oldest records whose removal brings the volume to at
    /// most `max_volume`, without mutating anything.
    ///
    /// Eviction is strictly oldest-first across pending and in-flight
    /// records alike.
    pub(crate) fn eviction_plan(&self, max_volume: u64) -> (Vec<RecordSeq>, u64) {
        let mut victims = Vec::new();
        let mut reclaimed: u64 = 0;
        let mut remaining = self.volume;

        for (&seq, record) in &self.records {
            if remaining <= max_volume {
                break;
            }
            remaining -= record.size_bytes();
            reclaimed += record.size_bytes();
            victims.push(seq);
        }

        (victims, reclaimed)
    }

    /// Destroys the oldest records until the volume is at or below
    /// `max_volume` or the arena is empty. Returns the bytes reclaimed.
    pub(crate) fn evict_to(&mut self, max_volume: u64) -> u64 {
        let (victims, reclaimed) = self.eviction_plan(max_volume);
        for seq in victims {
            self.retire(seq).expect("eviction victim exists in arena");
        }
        debug_assert!(
            self.volume <= max_volume || self.records.is_empty(),
            "eviction left volume above the limit"
        );
        reclaimed
    }

    /// Current volume: summed sizes of all pending + in-flight records.
    pub(crate) fn volume(&self) -> u64 {
        self.volume
    }

    /// Number of currently owned records.
    pub(crate) fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Iterates all owned records in arrival order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (RecordSeq, &LogRecord)> {
        self.records.iter().map(|(&seq, record)| (seq, record))
    }

    pub(crate) fn stats(&self) -> BufferStats {
        BufferStats {
            volume_bytes: self.volume,
            record_count: self.records.len(),
            pending_records: self.records.len() - self.bound.len(),
            in_flight_records: self.bound.len(),
            in_flight_blocks: self.in_flight.len(),
        }
    }
}

//! Journal compaction policy.
//!
//! Retired records leave dead entries behind in the journal file. When
//! dead bytes dominate, the journal is rewritten with only the live
//! records and atomically swapped into place. The policy here decides
//! when that happens; the rewrite itself lives on
//! [`JournalStore`](crate::JournalStore).

/// Configuration for journal compaction.
#[derive(Debug, Clone)]
pub struct CompactionConfig {
    /// Minimum journal file size before compaction triggers (bytes).
    pub min_file_bytes: u64,
    /// Fraction of the file that must be dead bytes before compaction
    /// triggers, in `0.0..=1.0`.
    pub dead_ratio: f64,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            min_file_bytes: 1024 * 1024, // 1 MiB
            dead_ratio: 0.5,
        }
    }
}

/// Result of a compaction pass.
#[derive(Debug, Clone)]
pub struct CompactionResult {
    /// Number of journal entries before compaction.
    pub entries_before: usize,
    /// Number of journal entries after compaction (live records).
    pub entries_after: usize,
    /// Bytes reclaimed from the journal file.
    pub bytes_reclaimed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = CompactionConfig::default();
        assert_eq!(config.min_file_bytes, 1024 * 1024);
        assert!((config.dead_ratio - 0.5).abs() < f64::EPSILON);
    }
}

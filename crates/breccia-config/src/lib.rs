//! Configuration management for Breccia
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (BRECCIA_* prefix)
//! 2. breccia.local.toml (gitignored, local overrides)
//! 3. breccia.toml (git-tracked, project config)
//! 4. ~/.config/breccia/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main Breccia configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    pub storage: StorageConfig,
    pub limits: LimitsConfig,
    pub compaction: CompactionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the journal file.
    pub data_dir: PathBuf,
    /// Whether every mutation fsyncs the journal before returning.
    pub fsync_on_append: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".breccia/data"),
            fsync_on_append: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Volume ceiling enforced by the capacity monitor.
    pub max_volume_bytes: u64,
    /// Default block size hint for the uploader.
    pub block_size_bytes: u64,
    /// Records larger than this are logged at ingestion: they can never
    /// fit a default-sized block and will sit pending until evicted.
    /// Zero means "use block_size_bytes".
    pub oversize_warn_bytes: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_volume_bytes: 16 * 1024 * 1024, // 16 MiB
            block_size_bytes: 512 * 1024,       // 512 KiB
            oversize_warn_bytes: 0,
        }
    }
}

impl LimitsConfig {
    /// The effective threshold above which an ingested record is flagged
    /// as unable to fit a default-sized block.
    pub fn effective_oversize_warn_bytes(&self) -> u64 {
        if self.oversize_warn_bytes == 0 {
            self.block_size_bytes
        } else {
            self.oversize_warn_bytes
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactionSettings {
    /// Minimum journal file size before compaction triggers (bytes).
    pub min_file_bytes: u64,
    /// Fraction of the journal that must be dead bytes before compaction
    /// triggers, in `0.0..=1.0`.
    pub dead_ratio: f64,
}

impl Default for CompactionSettings {
    fn default() -> Self {
        Self {
            min_file_bytes: 1024 * 1024, // 1 MiB
            dead_ratio: 0.5,
        }
    }
}

impl BufferConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Resolve relative paths to absolute
    pub fn resolve_paths(&mut self, base_dir: impl AsRef<Path>) {
        if self.storage.data_dir.is_relative() {
            self.storage.data_dir = base_dir.as_ref().join(&self.storage.data_dir);
        }
    }

    /// Path of the journal file inside the data directory.
    pub fn journal_path(&self) -> PathBuf {
        self.storage.data_dir.join("buffer.journal")
    }

    /// Checks cross-field consistency of the loaded values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.compaction.dead_ratio) {
            return Err(ConfigError::Invalid(format!(
                "compaction.dead_ratio must be within 0.0..=1.0, got {}",
                self.compaction.dead_ratio
            )));
        }
        if self.limits.block_size_bytes == 0 {
            return Err(ConfigError::Invalid(
                "limits.block_size_bytes must be greater than zero".to_string(),
            ));
        }
        if self.limits.block_size_bytes > self.limits.max_volume_bytes {
            return Err(ConfigError::Invalid(format!(
                "limits.block_size_bytes ({}) exceeds limits.max_volume_bytes ({})",
                self.limits.block_size_bytes, self.limits.max_volume_bytes
            )));
        }
        Ok(())
    }
}

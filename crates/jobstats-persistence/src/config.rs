//! Counter store configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Durable store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the stats log.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Appends after which the log is rewritten as one line per day.
    /// 0 disables periodic compaction (the log is still compacted on open).
    #[serde(default = "default_compact_after_records")]
    pub compact_after_records: usize,
    /// fsync each append before acknowledging the increment.
    #[serde(default = "default_sync_writes")]
    pub sync_writes: bool,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data/stats")
}

fn default_compact_after_records() -> usize {
    10_000
}

fn default_sync_writes() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            compact_after_records: default_compact_after_records(),
            sync_writes: default_sync_writes(),
        }
    }
}

impl StoreConfig {
    /// Config rooted at `data_dir` with default tuning.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }
}

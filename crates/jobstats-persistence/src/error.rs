//! Persistence error types.

use std::path::PathBuf;

use jobstats_core::StatsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corrupt stats log at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    #[error("Stats directory {} is locked by another process", .0.display())]
    Locked(PathBuf),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

impl From<PersistenceError> for StatsError {
    fn from(err: PersistenceError) -> Self {
        StatsError::StorageFailure(err.to_string())
    }
}

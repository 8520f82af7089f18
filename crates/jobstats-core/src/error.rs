//! Error types for job execution statistics.

use thiserror::Error;

/// Errors surfaced by the counter store and the stats service.
///
/// The store never swallows a storage error and the service never returns a
/// partial window, so every failure reaches the caller as one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatsError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage failure: {0}")]
    StorageFailure(String),

    #[error("Stats store is closed")]
    StoreClosed,

    #[error("Operation cancelled")]
    Cancelled,
}

impl StatsError {
    /// Whether the failure came from the storage engine itself.
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Self::StorageFailure(_))
    }
}

/// Result type alias for stats operations.
pub type StatsResult<T> = std::result::Result<T, StatsError>;

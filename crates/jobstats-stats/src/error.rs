//! Execution registry error types.

use jobstats_core::{ExecutionId, StatsError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Unknown execution: {0}")]
    NotFound(ExecutionId),

    #[error("Execution already finished: {0}")]
    AlreadyFinished(ExecutionId),

    #[error("Stats error: {0}")]
    Stats(#[from] StatsError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

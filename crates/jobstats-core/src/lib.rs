//! Core domain types for job execution statistics.
//!
//! This crate provides the fundamental types shared by every layer:
//! - `DayKey`: Canonical UTC day bucket used as the aggregation key
//! - `DayStat`, `StatsWindow`: Per-day success/failure counts and trailing windows
//! - `Execution`, `ExecutionState`: Execution lifecycle as seen by the completion hook
//! - `StatsError`: Error taxonomy surfaced by the store and the stats service

pub mod day;
pub mod error;
pub mod execution;
pub mod stats;

pub use day::{DayKey, ParseDayKeyError};
pub use error::{StatsError, StatsResult};
pub use execution::{Execution, ExecutionId, ExecutionState};
pub use stats::{DayStat, StatsWindow};

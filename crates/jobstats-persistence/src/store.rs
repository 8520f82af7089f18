//! Counter store contract.

use std::future::Future;

use jobstats_core::{DayKey, DayStat, StatsResult};
use tokio_util::sync::CancellationToken;

/// Durable owner of every per-day `DayStat`.
///
/// Implementations must apply `increment` as one indivisible read-modify-write
/// per day, must not serialize increments for different days behind a single
/// lock, and must hand out copies rather than references into their state.
pub trait CounterStore: Send + Sync {
    /// Add one success or one failure to `day`.
    ///
    /// Fails with `Cancelled` (and no effect) if `ctx` fires before the write
    /// starts, `StoreClosed` after `close`, and `StorageFailure` when the
    /// engine cannot complete the write.
    fn increment(
        &self,
        ctx: &CancellationToken,
        day: DayKey,
        success: bool,
    ) -> impl Future<Output = StatsResult<()>> + Send;

    /// Current record for `day`, all-zero if nothing was ever recorded.
    fn get(
        &self,
        ctx: &CancellationToken,
        day: DayKey,
    ) -> impl Future<Output = StatsResult<DayStat>> + Send;

    /// Every day with a persisted record, ascending.
    fn days(&self) -> StatsResult<Vec<DayKey>>;

    /// Release storage resources. Idempotent.
    fn close(&self) -> StatsResult<()>;

    fn is_closed(&self) -> bool;
}

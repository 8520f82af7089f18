//! Execution stats service.
//!
//! Increments go straight to the counter store under the derived day key.
//! Window reads are a bounded loop of point lookups, one per day, oldest
//! first. No lock is held across days, so each entry is individually
//! consistent but the window is not a single snapshot.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jobstats_core::{DayKey, StatsError, StatsResult, StatsWindow};
use jobstats_persistence::CounterStore;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Source of "now" for window reads.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Public stats API over a counter store.
pub struct StatsService<S> {
    store: Arc<S>,
    clock: Clock,
}

impl<S> Clone for StatsService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<S: CounterStore> StatsService<S> {
    /// Service using the system clock.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_clock(store, Arc::new(Utc::now))
    }

    /// Service with an explicit clock.
    pub fn with_clock(store: Arc<S>, clock: Clock) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Record one completion at `timestamp`.
    ///
    /// Store errors are returned unchanged.
    pub async fn increment_execution_stat(
        &self,
        ctx: &CancellationToken,
        timestamp: DateTime<Utc>,
        success: bool,
    ) -> StatsResult<()> {
        let day = DayKey::from_timestamp(&timestamp);
        self.store.increment(ctx, day, success).await
    }

    /// The last `window_days` days ending today, oldest first, zero-filled.
    ///
    /// `window_days <= 0` yields an empty window.
    pub async fn get_execution_stats(
        &self,
        ctx: &CancellationToken,
        window_days: i64,
    ) -> StatsResult<StatsWindow> {
        self.get_execution_stats_at(ctx, self.now(), window_days)
            .await
    }

    /// Same as `get_execution_stats` with "today" taken from `now`.
    ///
    /// Any failed lookup fails the whole call; no partial window is returned.
    pub async fn get_execution_stats_at(
        &self,
        ctx: &CancellationToken,
        now: DateTime<Utc>,
        window_days: i64,
    ) -> StatsResult<StatsWindow> {
        let span = match u64::try_from(window_days) {
            Ok(0) | Err(_) => return Ok(StatsWindow::default()),
            Ok(span) => span,
        };

        let today = DayKey::from_timestamp(&now);
        let oldest = today.days_before(span - 1).ok_or_else(|| {
            StatsError::InvalidInput(format!(
                "window of {window_days} days reaches past the supported calendar range"
            ))
        })?;

        let mut stats = Vec::new();
        for offset in 0..span {
            let day = oldest
                .days_after(offset)
                .ok_or_else(|| StatsError::InvalidInput(format!("day offset {offset} out of range")))?;
            stats.push(self.store.get(ctx, day).await?);
        }

        debug!(
            window_days,
            from = %oldest,
            to = %today,
            "Read execution stats window"
        );
        Ok(StatsWindow::new(stats))
    }
}

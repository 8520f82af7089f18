//! In-memory counter store.

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use jobstats_core::{DayKey, DayStat, StatsError, StatsResult};
use tokio_util::sync::CancellationToken;

use crate::store::CounterStore;

/// Non-durable counter store. Each increment is applied under the map entry
/// lock, so it is atomic per day but nothing survives the process.
#[derive(Default)]
pub struct MemoryCounterStore {
    stats: DashMap<DayKey, DayStat>,
    closed: AtomicBool,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check(&self, ctx: &CancellationToken) -> StatsResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StatsError::StoreClosed);
        }
        if ctx.is_cancelled() {
            return Err(StatsError::Cancelled);
        }
        Ok(())
    }
}

impl CounterStore for MemoryCounterStore {
    async fn increment(
        &self,
        ctx: &CancellationToken,
        day: DayKey,
        success: bool,
    ) -> StatsResult<()> {
        self.check(ctx)?;
        self.stats
            .entry(day)
            .and_modify(|stat| *stat = stat.incremented(success))
            .or_insert_with(|| DayStat::zero(day).incremented(success));
        Ok(())
    }

    async fn get(&self, ctx: &CancellationToken, day: DayKey) -> StatsResult<DayStat> {
        self.check(ctx)?;
        Ok(self
            .stats
            .get(&day)
            .map(|stat| *stat)
            .unwrap_or_else(|| DayStat::zero(day)))
    }

    fn days(&self) -> StatsResult<Vec<DayKey>> {
        if self.is_closed() {
            return Err(StatsError::StoreClosed);
        }
        let mut days: Vec<DayKey> = self.stats.iter().map(|entry| *entry.key()).collect();
        days.sort();
        Ok(days)
    }

    fn close(&self) -> StatsResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

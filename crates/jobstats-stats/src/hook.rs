//! Execution-completion hook.
//!
//! Invoked once per execution on its transition into a done state. Two side
//! effects are attempted independently:
//!
//! 1. the durable per-day counter (through `StatsService`)
//! 2. the process-wide metrics counter for the job
//!
//! A failure of either never suppresses the other. Both outcomes are kept in
//! the returned `CompletionReport`.

use std::sync::Arc;

use jobstats_core::{DayKey, Execution, StatsError, StatsResult};
use jobstats_persistence::CounterStore;
use jobstats_telemetry::{MetricsSink, TelemetryResult};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::service::StatsService;

/// Outcome of both side effects for one completed execution.
#[derive(Debug)]
pub struct CompletionReport {
    pub job_name: String,
    /// Day the completion was counted under.
    pub day: DayKey,
    pub stats: StatsResult<()>,
    pub metrics: TelemetryResult<()>,
}

impl CompletionReport {
    /// Both side effects succeeded.
    pub fn is_clean(&self) -> bool {
        self.stats.is_ok() && self.metrics.is_ok()
    }

    /// Collapse to the stats outcome. Metrics failures are not errors here.
    pub fn into_result(self) -> StatsResult<()> {
        self.stats
    }
}

/// Completion hook over a stats service and a metrics sink.
pub struct CompletionHook<S> {
    stats: Arc<StatsService<S>>,
    metrics: Arc<dyn MetricsSink>,
}

impl<S> Clone for CompletionHook<S> {
    fn clone(&self) -> Self {
        Self {
            stats: self.stats.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl<S: CounterStore> CompletionHook<S> {
    pub fn new(stats: Arc<StatsService<S>>, metrics: Arc<dyn MetricsSink>) -> Self {
        Self { stats, metrics }
    }

    pub fn stats(&self) -> &Arc<StatsService<S>> {
        &self.stats
    }

    /// Record a done execution.
    ///
    /// Fails with `InvalidInput` only when `execution` is still running;
    /// side-effect failures are reported in the returned report instead.
    pub async fn on_execution_done(
        &self,
        ctx: &CancellationToken,
        execution: &Execution,
    ) -> StatsResult<CompletionReport> {
        let Some((finished_at, success)) = execution.outcome() else {
            return Err(StatsError::InvalidInput(format!(
                "execution {} has not finished",
                execution.id
            )));
        };
        let day = DayKey::from_timestamp(&finished_at);

        let stats = self
            .stats
            .increment_execution_stat(ctx, finished_at, success)
            .await;
        if let Err(e) = &stats {
            error!(
                execution_id = %execution.id,
                job_name = %execution.job_name,
                day = %day,
                success,
                error = %e,
                "Failed to record execution stat"
            );
        }

        let metrics = if success {
            self.metrics.execution_succeeded(&execution.job_name)
        } else {
            self.metrics.execution_failed(&execution.job_name)
        };
        if let Err(e) = &metrics {
            warn!(
                execution_id = %execution.id,
                job_name = %execution.job_name,
                error = %e,
                "Failed to update execution metrics"
            );
        }

        debug!(
            execution_id = %execution.id,
            job_name = %execution.job_name,
            day = %day,
            success,
            "Execution completion recorded"
        );

        Ok(CompletionReport {
            job_name: execution.job_name.clone(),
            day,
            stats,
            metrics,
        })
    }
}

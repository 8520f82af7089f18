//! Execution metrics.
//!
//! Two monotonic counters labelled by job name:
//! - `<namespace>_job_executions_succeeded_total`
//! - `<namespace>_job_executions_failed_total`
//!
//! Counters are registered into a registry owned by the caller rather than the
//! prometheus default registry, so each application (and each test) gets its
//! own set.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

use crate::error::TelemetryResult;

const JOB_NAME_LABEL: &str = "job_name";

/// Sink for execution completion counters. Write-only.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
pub trait MetricsSink: Send + Sync {
    /// Count one successful execution of `job_name`.
    fn execution_succeeded(&self, job_name: &str) -> TelemetryResult<()>;

    /// Count one failed execution of `job_name`.
    fn execution_failed(&self, job_name: &str) -> TelemetryResult<()>;
}

/// Prometheus-backed execution counters.
#[derive(Clone)]
pub struct PrometheusSink {
    succeeded: IntCounterVec,
    failed: IntCounterVec,
}

impl PrometheusSink {
    /// Create the counters and register them into `registry`.
    ///
    /// Fails if counters with the same names are already registered there.
    pub fn register(registry: &Registry, namespace: &str) -> TelemetryResult<Self> {
        let succeeded = IntCounterVec::new(
            Opts::new(
                "executions_succeeded_total",
                "Total number of successful job executions",
            )
            .namespace(namespace)
            .subsystem("job"),
            &[JOB_NAME_LABEL],
        )?;
        let failed = IntCounterVec::new(
            Opts::new(
                "executions_failed_total",
                "Total number of failed job executions",
            )
            .namespace(namespace)
            .subsystem("job"),
            &[JOB_NAME_LABEL],
        )?;

        registry.register(Box::new(succeeded.clone()))?;
        registry.register(Box::new(failed.clone()))?;

        Ok(Self { succeeded, failed })
    }

    /// Current success count for a job.
    pub fn succeeded_count(&self, job_name: &str) -> u64 {
        self.succeeded
            .get_metric_with_label_values(&[job_name])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    /// Current failure count for a job.
    pub fn failed_count(&self, job_name: &str) -> u64 {
        self.failed
            .get_metric_with_label_values(&[job_name])
            .map(|c| c.get())
            .unwrap_or(0)
    }
}

impl MetricsSink for PrometheusSink {
    fn execution_succeeded(&self, job_name: &str) -> TelemetryResult<()> {
        self.succeeded
            .get_metric_with_label_values(&[job_name])?
            .inc();
        Ok(())
    }

    fn execution_failed(&self, job_name: &str) -> TelemetryResult<()> {
        self.failed.get_metric_with_label_values(&[job_name])?.inc();
        Ok(())
    }
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn execution_succeeded(&self, _job_name: &str) -> TelemetryResult<()> {
        Ok(())
    }

    fn execution_failed(&self, _job_name: &str) -> TelemetryResult<()> {
        Ok(())
    }
}

/// Render every metric in `registry` in the Prometheus text format.
pub fn render_text(registry: &Registry) -> TelemetryResult<String> {
    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    encoder.encode(&registry.gather(), &mut buf)?;
    Ok(String::from_utf8(buf)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_labelled_by_job() {
        let registry = Registry::new();
        let sink = PrometheusSink::register(&registry, "jobstats").unwrap();

        sink.execution_succeeded("backup").unwrap();
        sink.execution_succeeded("backup").unwrap();
        sink.execution_failed("backup").unwrap();
        sink.execution_failed("cleanup").unwrap();

        assert_eq!(sink.succeeded_count("backup"), 2);
        assert_eq!(sink.failed_count("backup"), 1);
        assert_eq!(sink.failed_count("cleanup"), 1);
        assert_eq!(sink.succeeded_count("cleanup"), 0);
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let registry = Registry::new();
        PrometheusSink::register(&registry, "jobstats").unwrap();
        assert!(PrometheusSink::register(&registry, "jobstats").is_err());
        // A separate registry is independent.
        assert!(PrometheusSink::register(&Registry::new(), "jobstats").is_ok());
    }

    #[test]
    fn test_render_text() {
        let registry = Registry::new();
        let sink = PrometheusSink::register(&registry, "jobstats").unwrap();
        sink.execution_failed("nightly").unwrap();

        let text = render_text(&registry).unwrap();
        assert!(text.contains("jobstats_job_executions_failed_total{job_name=\"nightly\"} 1"));
    }

    #[test]
    fn test_noop_sink() {
        let sink = NoopSink;
        assert!(sink.execution_succeeded("any").is_ok());
        assert!(sink.execution_failed("any").is_ok());
    }
}

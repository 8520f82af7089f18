//! Prometheus metrics and structured logging for jobstats.
//!
//! - `MetricsSink`: the process-wide execution counters, injected wherever a
//!   completion is reported so tests can substitute a no-op or a mock
//! - `PrometheusSink`: counters registered into a caller-owned registry
//! - Structured JSON / pretty logging with tracing

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::{render_text, MetricsSink, NoopSink, PrometheusSink};

#[cfg(any(test, feature = "mock"))]
pub use metrics::MockMetricsSink;

//! jobstats-dashboard - HTTP read surface for execution stats.
//!
//! Routes:
//!
//! ```text
//! GET /v1/stats?days=N  → trailing window of per-day counts (JSON)
//! GET /metrics          → Prometheus text exposition
//! GET /health           → liveness, 503 once the store is closed
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use jobstats_dashboard::{run_server, AppState, DashboardConfig};
//!
//! let shutdown = CancellationToken::new();
//! let state = AppState::new(stats_service, registry, DashboardConfig::default())
//!     .with_shutdown(shutdown.clone());
//! tokio::spawn(run_server(state));
//! ```

mod config;
mod server;
mod types;

pub use config::DashboardConfig;
pub use server::{create_router, run_server, AppState, DashboardError};
pub use types::{ApiError, ErrorBody, HealthBody, StatsQuery};

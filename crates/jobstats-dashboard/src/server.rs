//! HTTP server implementation using axum.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use jobstats_core::StatsWindow;
use jobstats_persistence::CounterStore;
use jobstats_stats::StatsService;
use prometheus::Registry;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use crate::config::DashboardConfig;
use crate::types::{ApiError, HealthBody, StatsQuery};

const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Dashboard IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state for axum handlers.
pub struct AppState<S> {
    stats: Arc<StatsService<S>>,
    registry: Registry,
    config: DashboardConfig,
    shutdown: CancellationToken,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            stats: self.stats.clone(),
            registry: self.registry.clone(),
            config: self.config.clone(),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<S: CounterStore + 'static> AppState<S> {
    pub fn new(stats: Arc<StatsService<S>>, registry: Registry, config: DashboardConfig) -> Self {
        Self {
            stats,
            registry,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Tie in-flight store calls and the listener to `shutdown`.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }
}

/// Create the axum router.
pub fn create_router<S: CounterStore + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/v1/stats", get(get_stats::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/health", get(get_health::<S>))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Trailing window of per-day execution counts.
async fn get_stats<S: CounterStore + 'static>(
    State(state): State<AppState<S>>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsWindow>, ApiError> {
    let window_days = state.config.effective_window(query.days);
    debug!(requested = ?query.days, window_days, "Serving stats window");
    let window = state
        .stats
        .get_execution_stats(&state.shutdown, window_days)
        .await?;
    Ok(Json(window))
}

/// Prometheus text exposition of the injected registry.
async fn get_metrics<S: CounterStore + 'static>(
    State(state): State<AppState<S>>,
) -> Result<Response, ApiError> {
    let body = jobstats_telemetry::render_text(&state.registry)?;
    Ok(([(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)], body).into_response())
}

async fn get_health<S: CounterStore + 'static>(State(state): State<AppState<S>>) -> Response {
    if state.stats.store().is_closed() {
        let body = HealthBody {
            status: "closed".to_string(),
        };
        return (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response();
    }
    Json(HealthBody {
        status: "ok".to_string(),
    })
    .into_response()
}

/// Run the dashboard HTTP server until the state's shutdown token fires.
pub async fn run_server<S: CounterStore + 'static>(
    state: AppState<S>,
) -> Result<(), DashboardError> {
    let port = state.config.port;
    let shutdown = state.shutdown.clone();
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, "Starting dashboard server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Dashboard server stopped");
    Ok(())
}

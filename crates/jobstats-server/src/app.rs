//! Main application orchestration.
//!
//! Coordinates all components:
//! - Durable counter store
//! - Stats service and completion hook
//! - Execution registry
//! - Prometheus registry and HTTP surface

use std::sync::Arc;

use axum::Router;
use jobstats_core::StatsWindow;
use jobstats_dashboard::{create_router, run_server, AppState};
use jobstats_persistence::{CounterStore, LogCounterStore};
use jobstats_stats::{Clock, CompletionHook, CompletionReport, ExecutionRegistry, StatsService};
use jobstats_telemetry::PrometheusSink;
use prometheus::Registry;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::error::AppResult;

/// Main application.
pub struct Application {
    config: AppConfig,
    store: Arc<LogCounterStore>,
    stats: Arc<StatsService<LogCounterStore>>,
    executions: Arc<ExecutionRegistry<LogCounterStore>>,
    metrics_registry: Registry,
    shutdown: CancellationToken,
}

impl Application {
    /// Open the store and build every component on top of it.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        Self::with_clock(config, Arc::new(chrono::Utc::now))
    }

    /// Same as `new` with an explicit clock for window reads and recording.
    pub fn with_clock(config: AppConfig, clock: Clock) -> AppResult<Self> {
        let store = Arc::new(LogCounterStore::open(config.storage.clone())?);
        let stats = Arc::new(StatsService::with_clock(store.clone(), clock));

        let metrics_registry = Registry::new();
        let sink = Arc::new(PrometheusSink::register(
            &metrics_registry,
            &config.metrics.namespace,
        )?);
        let hook = CompletionHook::new(stats.clone(), sink);
        let executions = Arc::new(ExecutionRegistry::new(hook));

        info!(
            data_dir = %config.storage.data_dir.display(),
            namespace = %config.metrics.namespace,
            "Application initialized"
        );

        Ok(Self {
            config,
            store,
            stats,
            executions,
            metrics_registry,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn stats(&self) -> &Arc<StatsService<LogCounterStore>> {
        &self.stats
    }

    pub fn executions(&self) -> &Arc<ExecutionRegistry<LogCounterStore>> {
        &self.executions
    }

    /// Root cancellation token. Cancelling it stops `run`.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// HTTP router over this application's state.
    pub fn router(&self) -> Router {
        create_router(self.dashboard_state())
    }

    fn dashboard_state(&self) -> AppState<LogCounterStore> {
        AppState::new(
            self.stats.clone(),
            self.metrics_registry.clone(),
            self.config.dashboard.clone(),
        )
        .with_shutdown(self.shutdown.clone())
    }

    /// Serve the HTTP API until ctrl-c or the shutdown token fires, then close
    /// the store.
    ///
    /// If the dashboard server stops on its own (e.g. its port is taken), the
    /// store is closed and the server's error is returned.
    pub async fn run(&self) -> AppResult<()> {
        let mut server = if self.config.dashboard.enabled {
            let state = self.dashboard_state();
            Some(tokio::spawn(run_server(state)))
        } else {
            info!("Dashboard disabled");
            None
        };

        let exited = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                None
            }
            _ = self.shutdown.cancelled() => {
                info!("Shutdown requested");
                None
            }
            result = async {
                match server.as_mut() {
                    Some(handle) => handle.await,
                    None => std::future::pending().await,
                }
            } => Some(result),
        };
        self.shutdown.cancel();

        let outcome = match (exited, server) {
            (Some(result), _) => Some(result),
            (None, Some(handle)) => Some(handle.await),
            (None, None) => None,
        };
        let closed = self.close();

        match outcome {
            Some(Ok(Err(e))) => {
                error!(error = %e, "Dashboard server failed");
                closed?;
                Err(e.into())
            }
            Some(Err(e)) => {
                error!(error = %e, "Dashboard server task panicked");
                closed?;
                Err(e.into())
            }
            Some(Ok(Ok(()))) | None => closed,
        }
    }

    /// Trailing window ending today.
    pub async fn stats_window(&self, days: i64) -> AppResult<StatsWindow> {
        Ok(self.stats.get_execution_stats(&self.shutdown, days).await?)
    }

    /// Every persisted day, ascending. Unlike a window, days without records
    /// are skipped.
    pub async fn all_stats(&self) -> AppResult<StatsWindow> {
        let mut stats = Vec::new();
        for day in self.store.days()? {
            stats.push(self.store.get(&self.shutdown, day).await?);
        }
        Ok(StatsWindow::new(stats))
    }

    /// Record one completed execution of `job_name` at the current time.
    pub async fn record(&self, job_name: &str, success: bool) -> AppResult<CompletionReport> {
        let now = self.stats.now();
        let id = self.executions.start(job_name, now);
        Ok(self
            .executions
            .finish(&self.shutdown, id, now, success)
            .await?)
    }

    /// Cancel in-flight work and close the store. Idempotent.
    pub fn close(&self) -> AppResult<()> {
        self.shutdown.cancel();
        if !self.store.is_closed() {
            self.store.close()?;
            info!("Stats store closed");
        }
        Ok(())
    }
}

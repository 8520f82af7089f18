//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Stats error: {0}")]
    Stats(#[from] jobstats_core::StatsError),

    #[error("Registry error: {0}")]
    Registry(#[from] jobstats_stats::RegistryError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] jobstats_telemetry::TelemetryError),

    #[error("Dashboard error: {0}")]
    Dashboard(#[from] jobstats_dashboard::DashboardError),

    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<::config::ConfigError> for AppError {
    fn from(e: ::config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

//! Job execution stats service.
//!
//! Wires the durable counter store, the stats service, the completion hook
//! and the HTTP surface into one application:
//! - `AppConfig`: TOML file plus `JOBSTATS__*` environment overrides
//! - `Application`: owns the store and every component built on it

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};

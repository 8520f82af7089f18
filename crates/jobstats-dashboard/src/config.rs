//! Dashboard configuration.

use serde::{Deserialize, Serialize};

/// Dashboard server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Enable dashboard server.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Window used when `/v1/stats` is called without `days`.
    #[serde(default = "default_window_days")]
    pub default_window_days: i64,
    /// Upper bound applied to requested windows.
    #[serde(default = "default_max_window_days")]
    pub max_window_days: i64,
}

fn default_enabled() -> bool {
    true
}

fn default_port() -> u16 {
    8080
}

fn default_window_days() -> i64 {
    30
}

fn default_max_window_days() -> i64 {
    366
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            port: default_port(),
            default_window_days: default_window_days(),
            max_window_days: default_max_window_days(),
        }
    }
}

impl DashboardConfig {
    /// Window actually served for a requested `days` value.
    ///
    /// Missing means the default window; anything above the maximum is
    /// clamped. Non-positive values pass through and yield an empty window.
    pub fn effective_window(&self, requested: Option<i64>) -> i64 {
        requested
            .unwrap_or(self.default_window_days)
            .min(self.max_window_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_window() {
        let config = DashboardConfig::default();
        assert_eq!(config.effective_window(None), 30);
        assert_eq!(config.effective_window(Some(7)), 7);
        assert_eq!(config.effective_window(Some(10_000)), 366);
        assert_eq!(config.effective_window(Some(0)), 0);
        assert_eq!(config.effective_window(Some(-3)), -3);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: DashboardConfig = serde_json::from_str(r#"{"port": 9090}"#).unwrap();
        assert_eq!(config.port, 9090);
        assert!(config.enabled);
        assert_eq!(config.max_window_days, 366);
    }
}

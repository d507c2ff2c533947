//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings.
    pub server: ServerConfig,

    /// Shutdown coordination settings.
    pub shutdown: ShutdownConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Shutdown coordination configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Signals that begin shutdown (e.g., "SIGINT", "TERM", "1").
    pub terminate_signals: Vec<String>,

    /// Time allowed for all cleanup tasks before the process is killed.
    pub deadline_secs: u64,

    /// Exit status used when the deadline elapses.
    pub force_exit_code: i32,
}

impl ShutdownConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            terminate_signals: vec![
                "SIGINT".to_string(),
                "SIGTERM".to_string(),
                "SIGHUP".to_string(),
            ],
            deadline_secs: 15,
            force_exit_code: 1,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.server.bind_address, "0.0.0.0:8000");
        assert_eq!(config.shutdown.terminate_signals, vec!["SIGINT", "SIGTERM", "SIGHUP"]);
        assert_eq!(config.shutdown.deadline(), Duration::from_secs(15));
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [shutdown]
            deadline_secs = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.shutdown.deadline_secs, 3);
        assert_eq!(config.shutdown.force_exit_code, 1);
        assert_eq!(config.observability.log_level, "info");
    }
}

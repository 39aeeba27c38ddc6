//! Workload console configuration.
//!
//! Configuration is loaded from environment variables.

use common::config::{BackendConfig, ObservabilityConfig, DEFAULT_API_BASE_URL};
use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Default interval between health checks while the backend is unavailable.
pub const DEFAULT_HEALTH_POLL_INTERVAL_MS: u64 = 5000;

/// Default HTTP request timeout in milliseconds.
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;

/// Project name shown until settings are loaded.
pub const DEFAULT_PROJECT_NAME: &str = "Health AI Suite";

/// Default tracing filter for the binary. Covers the crate's module paths and
/// its `console.*` log targets.
pub const DEFAULT_CONSOLE_LOG_FILTER: &str = "workload_console=info,console=info";

/// Workload console configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Companion backend connection.
    pub backend: BackendConfig,

    /// Interval between health checks while the backend is unavailable.
    pub health_poll_interval: Duration,

    /// Project name used until the backend settings override it.
    pub project_name: String,

    pub observability: ObservabilityConfig,

    /// Prometheus exporter listen address. Metrics are not exported when unset.
    pub metrics_addr: Option<SocketAddr>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid backend URL: {0}")]
    InvalidBackendUrl(String),

    #[error("Invalid duration configuration: {0}")]
    InvalidDuration(String),

    #[error("Invalid metrics address: {0}")]
    InvalidMetricsAddr(String),

    #[error("Invalid log configuration: {0}")]
    InvalidLogConfig(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let base_url = vars
            .get("API_BASE_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBackendUrl(format!(
                "API_BASE_URL must be an http(s) URL, got '{base_url}'"
            )));
        }

        let http_timeout = parse_millis(vars, "CONSOLE_HTTP_TIMEOUT_MS", DEFAULT_HTTP_TIMEOUT_MS)?;
        let health_poll_interval = parse_millis(
            vars,
            "CONSOLE_HEALTH_POLL_INTERVAL_MS",
            DEFAULT_HEALTH_POLL_INTERVAL_MS,
        )?;

        let project_name = vars
            .get("CONSOLE_PROJECT_NAME")
            .cloned()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string());

        let log_level = vars
            .get("CONSOLE_LOG_LEVEL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_CONSOLE_LOG_FILTER.to_string());

        let json_logs = match vars.get("CONSOLE_LOG_JSON").map(|s| s.trim().to_ascii_lowercase()) {
            None => false,
            Some(value) => match value.as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                _ => {
                    return Err(ConfigError::InvalidLogConfig(format!(
                        "CONSOLE_LOG_JSON must be a boolean, got '{value}'"
                    )))
                }
            },
        };

        let metrics_addr = vars
            .get("CONSOLE_METRICS_ADDR")
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.trim().parse::<SocketAddr>().map_err(|e| {
                    ConfigError::InvalidMetricsAddr(format!(
                        "CONSOLE_METRICS_ADDR must be a socket address, got '{s}': {e}"
                    ))
                })
            })
            .transpose()?;

        Ok(Config {
            backend: BackendConfig::new(base_url).with_http_timeout(http_timeout),
            health_poll_interval,
            project_name,
            observability: ObservabilityConfig {
                log_level,
                json_logs,
            },
            metrics_addr,
        })
    }
}

fn parse_millis(
    vars: &HashMap<String, String>,
    key: &str,
    default_ms: u64,
) -> Result<Duration, ConfigError> {
    let Some(value_str) = vars.get(key) else {
        return Ok(Duration::from_millis(default_ms));
    };

    let value: u64 = value_str.trim().parse().map_err(|e| {
        ConfigError::InvalidDuration(format!(
            "{key} must be a valid positive integer, got '{value_str}': {e}"
        ))
    })?;

    if value == 0 {
        return Err(ConfigError::InvalidDuration(format!(
            "{key} must be greater than 0"
        )));
    }

    Ok(Duration::from_millis(value))
}

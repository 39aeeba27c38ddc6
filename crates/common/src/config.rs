//! Common configuration types for the monitoring console.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default backend base URL used by the dashboards.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5001";

/// Default HTTP request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default log filter directive.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Backend connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the companion backend, without trailing slash
    pub base_url: String,
    /// Timeout applied to every request
    pub http_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl BackendConfig {
    /// Create a configuration for `base_url`, normalising away trailing slashes.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Join a path onto the base URL.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Observability configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log filter directive (trace, debug, info, warn, error or a full `EnvFilter` spec)
    pub log_level: String,
    /// Enable JSON-formatted logs
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            json_logs: false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_config_defaults() {
        let config = BackendConfig::default();
        assert_eq!(config.base_url, "http://localhost:5001");
        assert_eq!(config.http_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_backend_config_trims_trailing_slash() {
        let config = BackendConfig::new("http://backend:5001///");
        assert_eq!(config.base_url, "http://backend:5001");
        assert_eq!(config.url("/health"), "http://backend:5001/health");
        assert_eq!(config.url("settings"), "http://backend:5001/settings");
    }

    #[test]
    fn test_observability_config_roundtrips_through_json() {
        let config = ObservabilityConfig {
            log_level: "debug".to_string(),
            json_logs: true,
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ObservabilityConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}

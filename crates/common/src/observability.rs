//! Tracing subscriber initialisation shared by the console binaries.
//!
//! `RUST_LOG` wins when set; otherwise the configured log level is used as the
//! filter directive.

use crate::config::ObservabilityConfig;
use crate::error::ConsoleError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the `EnvFilter` for the given configuration.
///
/// # Errors
///
/// Returns `ConsoleError::Configuration` if the configured directive cannot be parsed.
pub fn build_env_filter(config: &ObservabilityConfig) -> Result<EnvFilter, ConsoleError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(&config.log_level).map_err(|e| {
        ConsoleError::Configuration(format!("Invalid log filter '{}': {e}", config.log_level))
    })
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns `ConsoleError::Configuration` if the filter is invalid, or
/// `ConsoleError::Internal` if a global subscriber is already installed.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<(), ConsoleError> {
    let filter = build_env_filter(config)?;

    let json_layer = config.json_logs.then(|| fmt::layer().json());
    let text_layer = (!config.json_logs).then(fmt::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| ConsoleError::Internal(format!("Failed to install tracing subscriber: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_is_configuration_error() {
        if std::env::var("RUST_LOG").is_ok() {
            // RUST_LOG takes precedence over the configured level
            return;
        }
        let config = ObservabilityConfig {
            log_level: "workload_console=notalevel".to_string(),
            json_logs: false,
        };
        let err = build_env_filter(&config).unwrap_err();
        assert!(matches!(err, ConsoleError::Configuration(_)));
    }

    #[test]
    fn test_valid_filter_builds() {
        let config = ObservabilityConfig {
            log_level: "workload_console=debug,stream_panel=info".to_string(),
            json_logs: true,
        };
        assert!(build_env_filter(&config).is_ok());
    }
}

//! Common error types for the monitoring console.
//!
//! The variants follow the console's error taxonomy:
//! - transport failures (`Http`) are surfaced to the user and never retried
//! - non-success HTTP statuses and unparseable bodies are reported as-is
//! - a well-formed response whose status field is not `"ok"` is a `Rejected` command

use thiserror::Error;

/// Common errors that can occur across the console components
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsoleError {
    /// Network transport error (connection refused, timeout, ...)
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Backend answered with a non-success HTTP status
    #[error("Backend returned status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// Response body could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Backend processed the command but reported a status other than "ok"
    #[error("Command rejected by backend: {0}")]
    Rejected(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Event subscription could not be opened or broke mid-stream
    #[error("Subscription error: {0}")]
    Subscription(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConsoleError {
    /// Returns true when the failure happened before the backend produced a response.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, ConsoleError::Http(_))
    }
}

/// Result type alias using `ConsoleError`
pub type Result<T> = std::result::Result<T, ConsoleError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formatting() {
        assert_eq!(
            ConsoleError::Http("connection refused".to_string()).to_string(),
            "HTTP request failed: connection refused"
        );
        assert_eq!(
            ConsoleError::UnexpectedStatus {
                status: 503,
                body: "unavailable".to_string()
            }
            .to_string(),
            "Backend returned status 503: unavailable"
        );
        assert_eq!(
            ConsoleError::Rejected("busy".to_string()).to_string(),
            "Command rejected by backend: busy"
        );
    }

    #[test]
    fn test_is_transport() {
        assert!(ConsoleError::Http("timeout".to_string()).is_transport());
        assert!(!ConsoleError::Rejected("error".to_string()).is_transport());
        assert!(!ConsoleError::UnexpectedStatus {
            status: 500,
            body: String::new()
        }
        .is_transport());
    }
}

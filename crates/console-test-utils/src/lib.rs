//! # Console Test Utilities
//!
//! Shared test utilities for the monitoring console crates.
//!
//! This crate provides:
//! - Fake companion backend (`FakeBackend`, backed by a wiremock server)
//! - SSE body builders for event stream tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use console_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let backend = FakeBackend::start().await;
//!     backend.mount_health(200).await;
//!     backend.mount_start("ok").await;
//!
//!     let client = HttpBackendClient::new(backend.backend_config())?;
//!     // Run your test...
//!     Ok(())
//! }
//! ```

pub mod fake_backend;

// Re-export commonly used items
pub use fake_backend::*;

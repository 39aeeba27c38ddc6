//! Common utilities and types shared across the monitoring console crates.

#![warn(clippy::pedantic)]

/// Module for common error types
pub mod error;

/// Module for common configuration
pub mod config;

/// Module for tracing subscriber setup
pub mod observability;

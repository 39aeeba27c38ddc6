//! Observability for the workload console.

pub mod metrics;

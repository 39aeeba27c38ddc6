//! Patient Monitoring Workload Console Library
//!
//! Headless core of the multi-modal patient monitoring console:
//!
//! - Backend health monitoring and one-shot settings load
//! - Start/stop of all monitoring workloads with rollback on failure
//! - Live workload readings over Server-Sent Events
//! - Single-slot transient notifications
//!
//! # Architecture
//!
//! ```text
//! BackendMonitor ──► ConsoleStore(backend_status, project_name)
//! WorkloadOrchestrator ──► BackendApi (start/stop)
//!         │                    │
//!         ├──► ConsoleStore(processing, running)   [Transaction, rolled back on failure]
//!         ├──► NotificationCenter
//!         └──► EventSubscription ──► SseDecoder ──► ConsoleStore(readings)
//! ```
//!
//! # Modules
//!
//! - [`config`] - Environment configuration
//! - [`workloads`] - Workload catalog and command targets
//! - [`client`] - Backend HTTP client and the `BackendApi` trait
//! - [`sse`] - Server-Sent Events decoding
//! - [`state`] - Console state, actions and transactions
//! - [`notify`] - Notification center
//! - [`subscription`] - Live event subscription task
//! - [`orchestrator`] - Workload start/stop
//! - [`monitor`] - Backend monitor task
//! - [`observability`] - Metrics

pub mod client;
pub mod config;
pub mod monitor;
pub mod notify;
pub mod observability;
pub mod orchestrator;
pub mod sse;
pub mod state;
pub mod subscription;
pub mod workloads;

pub use client::{BackendApi, CommandResponse, HttpBackendClient, Settings};
pub use config::Config;
pub use monitor::spawn_backend_monitor;
pub use notify::{Notification, NotificationCenter, NotificationKind};
pub use orchestrator::{StartOutcome, StopOutcome, WorkloadOrchestrator};
pub use state::{BackendStatus, ConsoleAction, ConsoleState, ConsoleStore, SubscriptionState};
pub use workloads::{WorkloadId, WorkloadSpec, WorkloadTarget};

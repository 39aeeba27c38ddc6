//! Workload start/stop orchestration.
//!
//! `start` applies the local changes optimistically inside a [`Transaction`],
//! then asks the backend to start every workload. If the backend rejects the
//! command or cannot be reached the transaction is rolled back, so the
//! processing flag and the per-workload flags return to their pre-call values.
//! The subscription is only opened once the backend accepted, so a failed
//! start leaves any existing subscription untouched.
//! An accepted start opens the live event subscription.
//!
//! `stop` is best effort: local state is cleared and the subscription closed
//! whatever the backend answers.
//!
//! Neither operation retries. Callers gate repeated invocations with
//! [`ConsoleState::can_start`](crate::state::ConsoleState::can_start) and
//! [`ConsoleState::can_stop`](crate::state::ConsoleState::can_stop).

use crate::client::{BackendApi, Command};
use crate::notify::{NotificationCenter, NotificationKind};
use crate::observability::metrics;
use crate::state::{BackendStatus, ConsoleAction, ConsoleStore};
use crate::subscription::EventSubscription;
use crate::workloads::{WorkloadId, WorkloadTarget};
use common::error::ConsoleError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

pub const MSG_BACKEND_NOT_READY: &str = "Backend is not ready";
pub const MSG_STARTING: &str = "Starting workloads...";
pub const MSG_STARTED: &str = "Workloads started successfully";
pub const MSG_START_FAILED: &str = "Failed to start";
pub const MSG_START_ERROR: &str = "Error starting workloads";
pub const MSG_STOPPING: &str = "Stopping...";
pub const MSG_STOPPED: &str = "Stopped successfully";
pub const MSG_STOP_FAILED: &str = "Failed to stop";

/// Visibility of short confirmations and rejections.
pub const SHORT_NOTICE: Duration = Duration::from_secs(3);

/// Visibility of errors that need the user's attention.
pub const LONG_NOTICE: Duration = Duration::from_secs(5);

/// Visibility of progress messages; each is replaced by the operation's result.
const PROGRESS_NOTICE: Duration = Duration::from_secs(30);

/// Result of a start request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Backend accepted; the subscription is open.
    Started,
    /// Backend was not available; nothing was sent.
    BackendNotReady,
    /// Backend answered with a status other than `ok`.
    Rejected { status: String },
    /// Request failed before a usable answer arrived.
    Failed(ConsoleError),
}

impl StartOutcome {
    fn metric_label(&self) -> &'static str {
        match self {
            StartOutcome::Started => "success",
            StartOutcome::BackendNotReady => "not_ready",
            StartOutcome::Rejected { .. } => "rejected",
            StartOutcome::Failed(_) => "error",
        }
    }
}

/// Result of a stop request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    Failed(ConsoleError),
}

/// Drives start/stop of all workloads.
pub struct WorkloadOrchestrator {
    api: Arc<dyn BackendApi>,
    store: ConsoleStore,
    notifications: NotificationCenter,
    subscription: Mutex<Option<EventSubscription>>,
}

impl WorkloadOrchestrator {
    #[must_use]
    pub fn new(api: Arc<dyn BackendApi>, store: ConsoleStore, notifications: NotificationCenter) -> Self {
        Self {
            api,
            store,
            notifications,
            subscription: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn store(&self) -> &ConsoleStore {
        &self.store
    }

    #[must_use]
    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    /// Start every workload and subscribe to their events.
    #[instrument(skip_all, name = "console.orchestrator.start")]
    pub async fn start(&self) -> StartOutcome {
        let outcome = self.run_start().await;
        metrics::record_workload_command(Command::Start.as_str(), outcome.metric_label());
        outcome
    }

    async fn run_start(&self) -> StartOutcome {
        if self.store.snapshot().backend_status != BackendStatus::Available {
            warn!(target: "console.orchestrator", "Start requested while backend is not ready");
            self.notifications
                .show(NotificationKind::Error, MSG_BACKEND_NOT_READY, LONG_NOTICE);
            return StartOutcome::BackendNotReady;
        }

        self.notifications
            .show(NotificationKind::Info, MSG_STARTING, PROGRESS_NOTICE);

        let mut tx = self.store.transaction();
        tx.apply(ConsoleAction::StartProcessing);
        tx.apply(ConsoleAction::StartAllWorkloads);

        match self.api.start(WorkloadTarget::All).await {
            Ok(response) if response.is_ok() => {
                tx.commit();
                info!(target: "console.orchestrator", "Workloads started");
                self.notifications
                    .show(NotificationKind::Success, MSG_STARTED, SHORT_NOTICE);

                let url = self.api.events_url(&WorkloadId::ALL);
                self.replace_subscription(Some(url)).await;
                StartOutcome::Started
            }
            Ok(response) => {
                tx.rollback();
                warn!(
                    target: "console.orchestrator",
                    status = %response.status,
                    message = ?response.message,
                    "Backend rejected start"
                );
                self.notifications
                    .show(NotificationKind::Error, MSG_START_FAILED, SHORT_NOTICE);
                StartOutcome::Rejected {
                    status: response.status,
                }
            }
            Err(e) => {
                tx.rollback();
                error!(target: "console.orchestrator", error = %e, "Start failed");
                self.notifications
                    .show(NotificationKind::Error, MSG_START_ERROR, LONG_NOTICE);
                StartOutcome::Failed(e)
            }
        }
    }

    /// Stop every workload and close the subscription.
    ///
    /// Local state is cleared before the backend is asked, and stays cleared
    /// whatever the backend answers.
    #[instrument(skip_all, name = "console.orchestrator.stop")]
    pub async fn stop(&self) -> StopOutcome {
        self.notifications
            .show(NotificationKind::Info, MSG_STOPPING, PROGRESS_NOTICE);
        self.store.dispatch(ConsoleAction::StopProcessing);
        self.store.dispatch(ConsoleAction::StopAllWorkloads);

        let result = self.api.stop(WorkloadTarget::All).await;
        self.replace_subscription(None).await;

        let outcome = match result {
            Ok(response) => {
                if !response.is_ok() {
                    warn!(
                        target: "console.orchestrator",
                        status = %response.status,
                        "Backend reported a problem stopping workloads"
                    );
                }
                info!(target: "console.orchestrator", "Workloads stopped");
                self.notifications
                    .show(NotificationKind::Success, MSG_STOPPED, SHORT_NOTICE);
                StopOutcome::Stopped
            }
            Err(e) => {
                error!(target: "console.orchestrator", error = %e, "Stop failed");
                self.notifications
                    .show(NotificationKind::Error, MSG_STOP_FAILED, SHORT_NOTICE);
                StopOutcome::Failed(e)
            }
        };

        let label = match &outcome {
            StopOutcome::Stopped => "success",
            StopOutcome::Failed(_) => "error",
        };
        metrics::record_workload_command(Command::Stop.as_str(), label);
        outcome
    }

    /// Close the current subscription, then open one to `url` if given.
    async fn replace_subscription(&self, url: Option<String>) {
        let mut slot = self.subscription.lock().await;

        if let Some(current) = slot.take() {
            current.disconnect().await;
        }
        self.store.dispatch(ConsoleAction::Disconnect);

        if let Some(url) = url {
            *slot = Some(EventSubscription::connect(
                Arc::clone(&self.api),
                url,
                self.store.clone(),
            ));
        }
    }

    /// URL of the open subscription, if any.
    pub async fn subscription_url(&self) -> Option<String> {
        self.subscription
            .lock()
            .await
            .as_ref()
            .map(|s| s.url().to_string())
    }

    /// Close the subscription without contacting the backend.
    pub async fn shutdown(&self) {
        self.replace_subscription(None).await;
    }
}

//! Backend monitor background task.
//!
//! Checks backend health immediately, then again on a fixed interval while the
//! backend is unavailable. The first successful check marks the backend
//! available, loads the project settings once and ends the task. A settings
//! failure is logged and the current project name is kept.
//!
//! # Graceful Shutdown
//!
//! The task exits when its cancellation token is triggered.

use crate::client::BackendApi;
use crate::observability::metrics;
use crate::state::{BackendStatus, ConsoleAction, ConsoleStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Spawn the backend monitor.
#[must_use]
pub fn spawn_backend_monitor(
    api: Arc<dyn BackendApi>,
    store: ConsoleStore,
    poll_interval: Duration,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(run_backend_monitor(api, store, poll_interval, cancel_token))
}

/// Run the backend monitor until the backend is available or the token is cancelled.
#[instrument(skip_all, name = "console.task.backend_monitor")]
pub async fn run_backend_monitor(
    api: Arc<dyn BackendApi>,
    store: ConsoleStore,
    poll_interval: Duration,
    cancel_token: CancellationToken,
) {
    info!(
        target: "console.task.backend_monitor",
        poll_interval_ms = u64::try_from(poll_interval.as_millis()).unwrap_or(u64::MAX),
        "Starting backend monitor"
    );

    store.dispatch(ConsoleAction::SetBackendStatus(BackendStatus::Checking));

    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let health = tokio::select! {
                    result = api.health() => Some(result),
                    () = cancel_token.cancelled() => None,
                };
                let Some(health) = health else {
                    info!(
                        target: "console.task.backend_monitor",
                        "Backend monitor cancelled during health check, exiting"
                    );
                    break;
                };

                match health {
                    Ok(()) => {
                        metrics::record_health_check("available");
                        store.dispatch(ConsoleAction::SetBackendStatus(BackendStatus::Available));
                        info!(target: "console.task.backend_monitor", "Backend is available");
                        load_settings(api.as_ref(), &store).await;
                        break;
                    }
                    Err(e) => {
                        metrics::record_health_check("unavailable");
                        let changed = store.dispatch(ConsoleAction::SetBackendStatus(BackendStatus::Unavailable));
                        if changed {
                            warn!(
                                target: "console.task.backend_monitor",
                                error = %e,
                                "Backend is not available, polling"
                            );
                        } else {
                            debug!(target: "console.task.backend_monitor", error = %e, "Backend still unavailable");
                        }
                    }
                }
            }
            () = cancel_token.cancelled() => {
                info!(
                    target: "console.task.backend_monitor",
                    "Backend monitor received shutdown signal, exiting"
                );
                break;
            }
        }
    }

    info!(target: "console.task.backend_monitor", "Backend monitor stopped");
}

async fn load_settings(api: &dyn BackendApi, store: &ConsoleStore) {
    match api.settings().await {
        Ok(settings) => {
            if let Some(name) = settings.project_name.filter(|n| !n.trim().is_empty()) {
                info!(target: "console.task.backend_monitor", project_name = %name, "Settings loaded");
                store.dispatch(ConsoleAction::SetProjectName(name));
            }
        }
        Err(e) => {
            warn!(
                target: "console.task.backend_monitor",
                error = %e,
                "Failed to load settings, keeping default project name"
            );
        }
    }
}

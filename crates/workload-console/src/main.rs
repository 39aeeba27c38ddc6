//! Workload Console
//!
//! Headless patient monitoring console. Waits for the companion backend,
//! starts every monitoring workload and logs live readings until shutdown.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Initialize tracing
//! 3. Install the Prometheus exporter when `CONSOLE_METRICS_ADDR` is set
//! 4. Spawn the backend monitor and wait for the backend
//! 5. Start all workloads and subscribe to their events
//! 6. Wait for shutdown signal, then stop all workloads

#![warn(clippy::pedantic)]

use std::sync::Arc;

use common::observability::init_tracing;
use tokio::signal;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use workload_console::client::HttpBackendClient;
use workload_console::config::Config;
use workload_console::observability::metrics::install_prometheus_exporter;
use workload_console::{
    spawn_backend_monitor, BackendStatus, ConsoleState, ConsoleStore, Notification,
    NotificationCenter, StartOutcome, WorkloadOrchestrator,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env().inspect_err(|e| {
        eprintln!("Failed to load configuration: {e}");
    })?;

    init_tracing(&config.observability)?;

    info!("Starting Workload Console");
    info!(
        api_base_url = %config.backend.base_url,
        health_poll_interval_ms = u64::try_from(config.health_poll_interval.as_millis()).unwrap_or(u64::MAX),
        project_name = %config.project_name,
        metrics_enabled = config.metrics_addr.is_some(),
        "Configuration loaded successfully"
    );

    if let Some(addr) = config.metrics_addr {
        install_prometheus_exporter(addr).map_err(|e| {
            error!(error = %e, addr = %addr, "Failed to install Prometheus exporter");
            e
        })?;
        info!(addr = %addr, "Prometheus exporter listening");
    }

    let api = Arc::new(HttpBackendClient::new(config.backend.clone()).map_err(|e| {
        error!(error = %e, "Failed to create backend client");
        e
    })?);

    let store = ConsoleStore::new(ConsoleState::new(config.project_name.clone()));
    let notifications = NotificationCenter::new();
    let orchestrator = WorkloadOrchestrator::new(api.clone(), store.clone(), notifications.clone());

    let shutdown_token = CancellationToken::new();

    tokio::spawn(log_notifications(
        notifications.subscribe(),
        shutdown_token.child_token(),
    ));
    tokio::spawn(log_readings(store.clone(), shutdown_token.child_token()));

    let monitor_handle = spawn_backend_monitor(
        api,
        store.clone(),
        config.health_poll_interval,
        shutdown_token.child_token(),
    );

    info!("Workload Console running - press Ctrl+C to shutdown");

    let mut state_rx = store.subscribe();
    let backend_ready = tokio::select! {
        ready = state_rx.wait_for(|s| s.backend_status == BackendStatus::Available) => ready.is_ok(),
        () = shutdown_signal() => false,
    };

    if backend_ready {
        let project_name = store.snapshot().project_name;
        info!(project_name = %project_name, "Backend ready, starting workloads");

        match orchestrator.start().await {
            StartOutcome::Started => {
                shutdown_signal().await;
                info!("Shutdown signal received, stopping workloads...");
                orchestrator.stop().await;
            }
            outcome => {
                warn!(outcome = ?outcome, "Workloads were not started");
                shutdown_signal().await;
            }
        }
    }

    info!("Initiating graceful shutdown...");
    orchestrator.shutdown().await;
    shutdown_token.cancel();

    if let Err(e) = monitor_handle.await {
        warn!(error = %e, "Backend monitor task failed");
    }

    info!("Workload Console shutdown complete");
    Ok(())
}

/// Log every notification as it is shown.
async fn log_notifications(
    mut rx: watch::Receiver<Option<Notification>>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = rx.borrow_and_update().clone();
                if let Some(notification) = current {
                    info!(target: "console.notify", kind = ?notification.kind, "{notification}");
                }
            }
            () = cancel_token.cancelled() => break,
        }
    }
}

/// Log readings as they arrive from the event stream.
async fn log_readings(store: ConsoleStore, cancel_token: CancellationToken) {
    let mut rx = store.subscribe();
    let mut last_seen = rx.borrow().readings.clone();

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let readings = rx.borrow_and_update().readings.clone();
                for (workload, reading) in &readings {
                    if last_seen.get(workload) == Some(reading) {
                        continue;
                    }
                    info!(
                        target: "console.readings",
                        workload = %workload,
                        values = %serde_json::Value::Object(reading.values.clone()),
                        waveform_samples = reading.waveform.as_ref().map_or(0, Vec::len),
                        "Reading received"
                    );
                }
                last_seen = readings;
            }
            () = cancel_token.cancelled() => break,
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

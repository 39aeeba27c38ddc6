//! Console state container.
//!
//! `ConsoleStore` holds the patient console state behind a `watch` channel.
//! State only changes through [`ConsoleAction`]s. Actions that an operation
//! may need to undo have an inverse computed against the state they were
//! applied to, so a [`Transaction`] can restore the exact pre-call values.

use crate::sse::WorkloadEvent;
use crate::workloads::{WorkloadId, WorkloadSpec};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Reading key carrying waveform samples.
pub const WAVEFORM_KEY: &str = "waveform";

/// Backend liveness as seen by the console.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendStatus {
    #[default]
    Checking,
    Available,
    Unavailable,
}

/// Live event subscription state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SubscriptionState {
    #[default]
    Disconnected,
    Connected {
        url: String,
    },
}

/// Latest reading of one workload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    /// Values for the workload's catalog keys.
    pub values: Map<String, Value>,
    /// Waveform samples, for workloads that stream one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waveform: Option<Vec<f64>>,
    /// Timestamp as reported by the workload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    pub received_at: DateTime<Utc>,
}

impl Reading {
    /// Build a reading from an event, keeping only the workload's catalog keys.
    #[must_use]
    pub fn from_event(spec: &WorkloadSpec, event: &WorkloadEvent, received_at: DateTime<Utc>) -> Self {
        let values = event
            .data
            .iter()
            .filter(|(key, _)| spec.accepts_key(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let waveform = if spec.has_waveform {
            event
                .data
                .get(WAVEFORM_KEY)
                .and_then(Value::as_array)
                .map(|samples| samples.iter().filter_map(Value::as_f64).collect())
        } else {
            None
        };

        Self {
            values,
            waveform,
            timestamp: event.timestamp.clone(),
            received_at,
        }
    }
}

/// Patient console state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsoleState {
    pub backend_status: BackendStatus,
    pub project_name: String,
    /// Workloads have been started from this console.
    pub processing: bool,
    /// Per-workload running flag.
    pub running: BTreeMap<WorkloadId, bool>,
    pub subscription: SubscriptionState,
    pub readings: BTreeMap<WorkloadId, Reading>,
}

impl ConsoleState {
    #[must_use]
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            backend_status: BackendStatus::Checking,
            project_name: project_name.into(),
            processing: false,
            running: WorkloadId::ALL.into_iter().map(|id| (id, false)).collect(),
            subscription: SubscriptionState::Disconnected,
            readings: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn is_running(&self, id: WorkloadId) -> bool {
        self.running.get(&id).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn running_workloads(&self) -> Vec<WorkloadId> {
        self.running
            .iter()
            .filter_map(|(id, running)| running.then_some(*id))
            .collect()
    }

    /// Start is offered only when the backend is up and nothing is running.
    #[must_use]
    pub fn can_start(&self) -> bool {
        self.backend_status == BackendStatus::Available && !self.processing
    }

    #[must_use]
    pub fn can_stop(&self) -> bool {
        self.processing
    }
}

/// A state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleAction {
    SetBackendStatus(BackendStatus),
    SetProjectName(String),
    StartProcessing,
    StopProcessing,
    StartAllWorkloads,
    StopAllWorkloads,
    /// Put every running flag back to a recorded value.
    RestoreWorkloads(BTreeMap<WorkloadId, bool>),
    Connect { url: String },
    Disconnect,
    /// The stream at `url` ended on its own. Ignored if another subscription
    /// replaced it.
    SubscriptionClosed { url: String },
    RecordReading { workload: WorkloadId, reading: Reading },
}

impl ConsoleAction {
    fn name(&self) -> &'static str {
        match self {
            ConsoleAction::SetBackendStatus(_) => "set_backend_status",
            ConsoleAction::SetProjectName(_) => "set_project_name",
            ConsoleAction::StartProcessing => "start_processing",
            ConsoleAction::StopProcessing => "stop_processing",
            ConsoleAction::StartAllWorkloads => "start_all_workloads",
            ConsoleAction::StopAllWorkloads => "stop_all_workloads",
            ConsoleAction::RestoreWorkloads(_) => "restore_workloads",
            ConsoleAction::Connect { .. } => "connect",
            ConsoleAction::Disconnect => "disconnect",
            ConsoleAction::SubscriptionClosed { .. } => "subscription_closed",
            ConsoleAction::RecordReading { .. } => "record_reading",
        }
    }

    /// Apply the action to `state`.
    pub fn apply(self, state: &mut ConsoleState) {
        match self {
            ConsoleAction::SetBackendStatus(status) => state.backend_status = status,
            ConsoleAction::SetProjectName(name) => state.project_name = name,
            ConsoleAction::StartProcessing => state.processing = true,
            ConsoleAction::StopProcessing => state.processing = false,
            ConsoleAction::StartAllWorkloads => set_all_running(state, true),
            ConsoleAction::StopAllWorkloads => set_all_running(state, false),
            ConsoleAction::RestoreWorkloads(running) => state.running = running,
            ConsoleAction::Connect { url } => {
                state.subscription = SubscriptionState::Connected { url };
            }
            ConsoleAction::Disconnect => state.subscription = SubscriptionState::Disconnected,
            ConsoleAction::SubscriptionClosed { url } => {
                if matches!(&state.subscription, SubscriptionState::Connected { url: current } if *current == url)
                {
                    state.subscription = SubscriptionState::Disconnected;
                }
            }
            ConsoleAction::RecordReading { workload, reading } => {
                state.readings.insert(workload, reading);
            }
        }
    }

    /// The action that undoes this one when applied after it to `before`.
    ///
    /// Returns `None` for actions that are never rolled back.
    #[must_use]
    pub fn inverse(&self, before: &ConsoleState) -> Option<ConsoleAction> {
        match self {
            ConsoleAction::StartProcessing | ConsoleAction::StopProcessing => {
                Some(if before.processing {
                    ConsoleAction::StartProcessing
                } else {
                    ConsoleAction::StopProcessing
                })
            }
            ConsoleAction::StartAllWorkloads
            | ConsoleAction::StopAllWorkloads
            | ConsoleAction::RestoreWorkloads(_) => {
                Some(ConsoleAction::RestoreWorkloads(before.running.clone()))
            }
            ConsoleAction::Connect { .. } | ConsoleAction::Disconnect => {
                Some(match &before.subscription {
                    SubscriptionState::Connected { url } => ConsoleAction::Connect { url: url.clone() },
                    SubscriptionState::Disconnected => ConsoleAction::Disconnect,
                })
            }
            ConsoleAction::SetBackendStatus(_)
            | ConsoleAction::SetProjectName(_)
            | ConsoleAction::SubscriptionClosed { .. }
            | ConsoleAction::RecordReading { .. } => None,
        }
    }
}

fn set_all_running(state: &mut ConsoleState, running: bool) {
    for id in WorkloadId::ALL {
        state.running.insert(id, running);
    }
}

/// Shared handle to the console state.
#[derive(Debug, Clone)]
pub struct ConsoleStore {
    sender: watch::Sender<ConsoleState>,
}

impl Default for ConsoleStore {
    fn default() -> Self {
        Self::new(ConsoleState::new(crate::config::DEFAULT_PROJECT_NAME))
    }
}

impl ConsoleStore {
    #[must_use]
    pub fn new(initial: ConsoleState) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    #[must_use]
    pub fn snapshot(&self) -> ConsoleState {
        self.sender.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConsoleState> {
        self.sender.subscribe()
    }

    /// Apply `action`. Returns true if the state changed.
    pub fn dispatch(&self, action: ConsoleAction) -> bool {
        self.dispatch_inner(action, false).0
    }

    /// Apply `action` and return its inverse, computed atomically with the change.
    pub fn dispatch_reversible(&self, action: ConsoleAction) -> Option<ConsoleAction> {
        self.dispatch_inner(action, true).1
    }

    fn dispatch_inner(&self, action: ConsoleAction, want_inverse: bool) -> (bool, Option<ConsoleAction>) {
        let name = action.name();
        let mut inverse = None;

        let changed = self.sender.send_if_modified(|state| {
            if want_inverse {
                inverse = action.inverse(state);
            }
            let before = state.clone();
            action.apply(state);
            *state != before
        });

        if changed && !matches!(name, "record_reading") {
            debug!(target: "console.store", action = name, "State updated");
        }

        (changed, inverse)
    }

    /// Store the latest reading carried by `event`.
    ///
    /// Events for workloads outside the catalog are ignored. Returns the
    /// workload the reading was recorded for.
    pub fn record_event(&self, event: &WorkloadEvent) -> Option<WorkloadId> {
        let Ok(workload) = event.workload.parse::<WorkloadId>() else {
            warn!(
                target: "console.store",
                workload = %event.workload,
                "Ignoring event for unknown workload"
            );
            return None;
        };

        let reading = Reading::from_event(workload.spec(), event, Utc::now());
        self.dispatch(ConsoleAction::RecordReading { workload, reading });
        Some(workload)
    }

    /// Start a set of reversible changes.
    #[must_use]
    pub fn transaction(&self) -> Transaction<'_> {
        Transaction {
            store: self,
            undo: Vec::new(),
        }
    }
}

/// Reversible changes applied to a store.
///
/// Each applied action records its inverse. [`Transaction::rollback`] applies
/// the inverses newest first; dropping or committing the transaction keeps
/// the changes.
#[must_use]
pub struct Transaction<'a> {
    store: &'a ConsoleStore,
    undo: Vec<ConsoleAction>,
}

impl Transaction<'_> {
    pub fn apply(&mut self, action: ConsoleAction) {
        if let Some(inverse) = self.store.dispatch_reversible(action) {
            self.undo.push(inverse);
        }
    }

    /// Keep the applied changes.
    pub fn commit(self) {}

    /// Undo every applied change.
    pub fn rollback(self) {
        for action in self.undo.into_iter().rev() {
            self.store.dispatch(action);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(workload: &str, data: Value) -> WorkloadEvent {
        WorkloadEvent {
            workload: workload.to_string(),
            timestamp: Some(json!(1_717_171_717)),
            data: data.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_initial_state() {
        let state = ConsoleState::new("Health AI Suite");
        assert_eq!(state.backend_status, BackendStatus::Checking);
        assert_eq!(state.running.len(), 4);
        assert!(state.running_workloads().is_empty());
        assert!(!state.can_start());
        assert!(!state.can_stop());
    }

    #[test]
    fn test_start_guards() {
        let store = ConsoleStore::default();
        store.dispatch(ConsoleAction::SetBackendStatus(BackendStatus::Available));
        assert!(store.snapshot().can_start());

        store.dispatch(ConsoleAction::StartProcessing);
        let state = store.snapshot();
        assert!(!state.can_start());
        assert!(state.can_stop());
    }

    #[test]
    fn test_identical_dispatch_does_not_notify() {
        let store = ConsoleStore::default();
        let rx = store.subscribe();
        assert!(!store.dispatch(ConsoleAction::StopProcessing));
        assert!(!rx.has_changed().unwrap());
        assert!(store.dispatch(ConsoleAction::StartAllWorkloads));
        assert!(rx.has_changed().unwrap());
    }

    #[test]
    fn test_rollback_restores_pre_call_values() {
        let store = ConsoleStore::default();
        // One workload was already running before the transaction
        store.dispatch(ConsoleAction::RestoreWorkloads(
            WorkloadId::ALL
                .into_iter()
                .map(|id| (id, id == WorkloadId::Mdpnp))
                .collect(),
        ));
        let before = store.snapshot();

        let mut tx = store.transaction();
        tx.apply(ConsoleAction::StartProcessing);
        tx.apply(ConsoleAction::StartAllWorkloads);
        assert!(store.snapshot().processing);
        assert_eq!(store.snapshot().running_workloads().len(), 4);

        tx.rollback();
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_commit_keeps_changes() {
        let store = ConsoleStore::default();
        let mut tx = store.transaction();
        tx.apply(ConsoleAction::StartProcessing);
        tx.apply(ConsoleAction::Connect {
            url: "http://b/events".to_string(),
        });
        tx.commit();

        let state = store.snapshot();
        assert!(state.processing);
        assert_eq!(
            state.subscription,
            SubscriptionState::Connected {
                url: "http://b/events".to_string()
            }
        );
    }

    #[test]
    fn test_subscription_closed_only_affects_matching_url() {
        let store = ConsoleStore::default();
        store.dispatch(ConsoleAction::Connect {
            url: "http://b/events?workloads=rppg".to_string(),
        });

        assert!(!store.dispatch(ConsoleAction::SubscriptionClosed {
            url: "http://old/events".to_string()
        }));
        assert!(store.dispatch(ConsoleAction::SubscriptionClosed {
            url: "http://b/events?workloads=rppg".to_string()
        }));
        assert_eq!(store.snapshot().subscription, SubscriptionState::Disconnected);
    }

    #[test]
    fn test_record_event_keeps_catalog_keys_only() {
        let store = ConsoleStore::default();
        let recorded = store.record_event(&event(
            "rppg",
            json!({ "HR": 72, "RR": 15, "SpO2": 98, "waveform": [0.1, 0.2, "x"] }),
        ));
        assert_eq!(recorded, Some(WorkloadId::Rppg));

        let state = store.snapshot();
        let reading = state.readings.get(&WorkloadId::Rppg).unwrap();
        assert_eq!(reading.values.len(), 2);
        assert_eq!(reading.values.get("HR"), Some(&json!(72)));
        assert!(reading.values.get("SpO2").is_none());
        assert_eq!(reading.waveform, Some(vec![0.1, 0.2]));
        assert_eq!(reading.timestamp, Some(json!(1_717_171_717)));
    }

    #[test]
    fn test_pose_readings_have_no_waveform() {
        let store = ConsoleStore::default();
        store.record_event(&event(
            "3d-pose",
            json!({ "activity": "sitting", "waveform": [1.0] }),
        ));
        let state = store.snapshot();
        let reading = state.readings.get(&WorkloadId::Pose3d).unwrap();
        assert_eq!(reading.values.get("activity"), Some(&json!("sitting")));
        assert_eq!(reading.waveform, None);
    }

    #[test]
    fn test_unknown_workload_is_ignored() {
        let store = ConsoleStore::default();
        let rx = store.subscribe();
        assert_eq!(store.record_event(&event("eeg", json!({ "alpha": 1 }))), None);
        assert!(!rx.has_changed().unwrap());
        assert!(store.snapshot().readings.is_empty());
    }
}

//! Active-stream selection.
//!
//! The selector reacts to changes of the three camera endpoints and of the
//! analytics-active flag. Other store changes (including its own write-back
//! and manual picks) do not trigger a recomputation.
//!
//! # Graceful Shutdown
//!
//! The background task exits when its cancellation token is triggered or when
//! the store is dropped.

use crate::endpoint::{StreamEndpoints, StreamRole};
use crate::store::{UiState, UiStore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Compute which stream(s) should be displayed.
///
/// Returns `None` when analytics is inactive or no endpoint is valid, the
/// single valid role when there is exactly one, and `All` otherwise.
#[must_use]
pub fn select_active_stream(
    endpoints: &StreamEndpoints,
    analytics_active: bool,
) -> Option<StreamRole> {
    if !analytics_active {
        return None;
    }

    match endpoints.available_roles().as_slice() {
        [] => None,
        [only] => Some(*only),
        _ => Some(StreamRole::All),
    }
}

/// The part of the UI state the selector depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SelectorInputs {
    endpoints: StreamEndpoints,
    analytics_active: bool,
}

impl SelectorInputs {
    fn from_state(state: &UiState) -> Self {
        Self {
            endpoints: state.endpoints.clone(),
            analytics_active: state.analytics.active,
        }
    }
}

/// Recompute the selection from the current state and write it back.
///
/// Returns true if the stored selection changed.
pub fn apply_selection(store: &UiStore) -> bool {
    let state = store.snapshot();
    let selection = select_active_stream(&state.endpoints, state.analytics.active);
    let changed = store.set_active_stream(selection);

    if changed {
        debug!(
            target: "stream_panel.selector",
            active_stream = ?selection,
            "Active stream updated"
        );
    }

    changed
}

/// Handle a user picking a stream.
///
/// The pick is ignored when the role cannot be displayed: a camera role with
/// an invalid endpoint, or `All` while no endpoint is valid. Returns true if
/// the pick was applied.
pub fn select_stream(store: &UiStore, role: StreamRole) -> bool {
    let available = store.snapshot().endpoints.is_available(role);
    if !available {
        debug!(
            target: "stream_panel.selector",
            role = %role,
            "Ignoring pick of unavailable stream"
        );
        return false;
    }

    store.set_active_stream(Some(role));
    true
}

/// Spawn the reactive selector task.
///
/// Applies the selection once on start, then again whenever the endpoints
/// or the analytics-active flag change.
#[must_use]
pub fn spawn_active_stream_selector(
    store: UiStore,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(run_selector(store, cancel_token))
}

#[instrument(skip_all, name = "stream_panel.selector")]
async fn run_selector(store: UiStore, cancel_token: CancellationToken) {
    let mut receiver = store.subscribe();
    let mut last_inputs = SelectorInputs::from_state(&receiver.borrow_and_update());
    apply_selection(&store);

    info!(target: "stream_panel.selector", "Active stream selector started");

    loop {
        tokio::select! {
            changed = receiver.changed() => {
                if changed.is_err() {
                    break;
                }

                let inputs = SelectorInputs::from_state(&receiver.borrow_and_update());
                if inputs == last_inputs {
                    continue;
                }
                last_inputs = inputs;
                apply_selection(&store);
            }
            () = cancel_token.cancelled() => {
                break;
            }
        }
    }

    info!(target: "stream_panel.selector", "Active stream selector stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn endpoints(front: Option<&str>, back: Option<&str>, content: Option<&str>) -> StreamEndpoints {
        StreamEndpoints {
            front: front.map(str::to_string),
            back: back.map(str::to_string),
            content: content.map(str::to_string),
        }
    }

    #[test]
    fn test_inactive_analytics_selects_none() {
        let e = endpoints(Some("http://a"), Some("http://b"), None);
        assert_eq!(select_active_stream(&e, false), None);
    }

    #[test]
    fn test_no_valid_endpoint_selects_none() {
        let e = endpoints(Some(""), Some("ftp://b"), None);
        assert_eq!(select_active_stream(&e, true), None);
    }

    #[test]
    fn test_single_valid_endpoint_selects_its_role() {
        let e = endpoints(Some("https://cam/stream"), Some("  "), Some("nope"));
        assert_eq!(select_active_stream(&e, true), Some(StreamRole::Front));

        let e = endpoints(None, None, Some("board.m3u8"));
        assert_eq!(select_active_stream(&e, true), Some(StreamRole::Content));
    }

    #[test]
    fn test_multiple_valid_endpoints_select_all() {
        let e = endpoints(Some("http://a"), Some("rtsp://b"), None);
        assert_eq!(select_active_stream(&e, true), Some(StreamRole::All));
    }

    #[test]
    fn test_apply_selection_is_idempotent() {
        let store = UiStore::default();
        store.set_endpoint(StreamRole::Back, Some("rtsp://back".to_string()));
        store.update(|s| s.analytics.active = true);

        assert!(apply_selection(&store));
        assert!(!apply_selection(&store));
        assert_eq!(store.snapshot().active_stream, Some(StreamRole::Back));
    }

    #[test]
    fn test_manual_pick_of_unavailable_stream_is_ignored() {
        let store = UiStore::default();
        assert!(!select_stream(&store, StreamRole::All));
        assert!(!select_stream(&store, StreamRole::Front));
        assert_eq!(store.snapshot().active_stream, None);

        store.set_endpoint(StreamRole::Front, Some("http://front".to_string()));
        assert!(!select_stream(&store, StreamRole::Back));
        assert!(select_stream(&store, StreamRole::Front));
        assert_eq!(store.snapshot().active_stream, Some(StreamRole::Front));
        assert!(select_stream(&store, StreamRole::All));
        assert_eq!(store.snapshot().active_stream, Some(StreamRole::All));
    }
}

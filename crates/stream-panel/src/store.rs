//! UI state container with change notification.
//!
//! `UiStore` owns the classroom UI state behind a `tokio::sync::watch`
//! channel. Every write goes through [`UiStore::update`], which only notifies
//! subscribers when the state actually changed, so writing an identical value
//! is not observed as a transition.

use crate::endpoint::{StreamEndpoints, StreamRole};
use crate::status::{
    derive_status, AnalyticsSignal, DisplayStatus, RecordingSources, StreamSignals, VideoStatus,
};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Classroom UI state. Last writer wins for every field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiState {
    pub endpoints: StreamEndpoints,
    /// Written by the active-stream selector or by a manual pick.
    pub active_stream: Option<StreamRole>,
    pub analytics: AnalyticsSignal,
    pub video_status: VideoStatus,
    /// Uploaded audio path, or the microphone marker.
    pub uploaded_audio_path: Option<String>,
    pub ai_processing: bool,
    pub transcript_streaming: bool,
}

impl UiState {
    /// Inputs of the recording indicator.
    #[must_use]
    pub fn recording_sources(&self) -> RecordingSources {
        RecordingSources {
            ai_processing: self.ai_processing,
            audio_source: self.uploaded_audio_path.clone(),
            transcript_streaming: self.transcript_streaming,
            analytics_active: self.analytics.active,
        }
    }

    /// Signals consumed by the status derivation.
    #[must_use]
    pub fn signals(&self) -> StreamSignals {
        StreamSignals {
            has_valid_streams: self.endpoints.has_valid_streams(),
            analytics: self.analytics,
            video_status: self.video_status,
            recording: self.recording_sources().is_recording(),
        }
    }

    /// Current display status.
    #[must_use]
    pub fn display_status(&self) -> DisplayStatus {
        derive_status(&self.signals())
    }
}

/// Shared handle to the UI state.
///
/// Cloning the store yields another handle to the same state.
#[derive(Debug, Clone)]
pub struct UiStore {
    sender: watch::Sender<UiState>,
}

impl Default for UiStore {
    fn default() -> Self {
        Self::new(UiState::default())
    }
}

impl UiStore {
    #[must_use]
    pub fn new(initial: UiState) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> UiState {
        self.sender.borrow().clone()
    }

    /// Receiver notified on every effective change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.sender.subscribe()
    }

    /// Apply `mutate` to the state. Returns true if the state changed.
    pub fn update<F>(&self, mutate: F) -> bool
    where
        F: FnOnce(&mut UiState),
    {
        self.sender.send_if_modified(|state| {
            let before = state.clone();
            mutate(state);
            *state != before
        })
    }

    pub fn set_endpoint(&self, role: StreamRole, endpoint: Option<String>) -> bool {
        self.update(|state| state.endpoints.set(role, endpoint))
    }

    pub fn set_endpoints(&self, endpoints: StreamEndpoints) -> bool {
        self.update(|state| state.endpoints = endpoints)
    }

    pub fn set_active_stream(&self, active: Option<StreamRole>) -> bool {
        self.update(|state| state.active_stream = active)
    }

    pub fn set_analytics(&self, analytics: AnalyticsSignal) -> bool {
        self.update(|state| state.analytics = analytics)
    }

    pub fn set_video_status(&self, status: VideoStatus) -> bool {
        self.update(|state| state.video_status = status)
    }

    pub fn set_uploaded_audio_path(&self, path: Option<String>) -> bool {
        self.update(|state| state.uploaded_audio_path = path)
    }

    pub fn set_ai_processing(&self, processing: bool) -> bool {
        self.update(|state| state.ai_processing = processing)
    }

    pub fn set_transcript_streaming(&self, streaming: bool) -> bool {
        self.update(|state| state.transcript_streaming = streaming)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::status::MICROPHONE_SOURCE;

    #[test]
    fn test_identical_write_does_not_notify() {
        let store = UiStore::default();
        let mut rx = store.subscribe();

        assert!(store.set_video_status(VideoStatus::Streaming));
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        assert!(!store.set_video_status(VideoStatus::Streaming));
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_setting_all_endpoint_is_not_a_change() {
        let store = UiStore::default();
        assert!(!store.set_endpoint(StreamRole::All, Some("http://cam".to_string())));
    }

    #[test]
    fn test_display_status_follows_state() {
        let store = UiStore::default();
        assert_eq!(store.snapshot().display_status(), DisplayStatus::Inactive);

        store.set_uploaded_audio_path(Some(MICROPHONE_SOURCE.to_string()));
        assert_eq!(store.snapshot().display_status(), DisplayStatus::AudioOnly);

        store.set_endpoint(StreamRole::Front, Some("https://cam/stream".to_string()));
        store.set_analytics(AnalyticsSignal {
            active: true,
            loading: false,
        });
        assert_eq!(store.snapshot().display_status(), DisplayStatus::Active);

        store.set_analytics(AnalyticsSignal {
            active: true,
            loading: true,
        });
        assert_eq!(store.snapshot().display_status(), DisplayStatus::Loading);
    }

    #[test]
    fn test_analytics_active_counts_as_recording() {
        let state = UiState {
            analytics: AnalyticsSignal {
                active: true,
                loading: false,
            },
            ..Default::default()
        };
        assert!(state.signals().recording);
        // Active analytics but no streams: audio only
        assert_eq!(state.display_status(), DisplayStatus::AudioOnly);
    }
}

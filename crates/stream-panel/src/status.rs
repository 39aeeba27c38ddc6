//! Display status derivation for the stream panel.
//!
//! The display status is never stored. It is recomputed from the external
//! store on every change, using a fixed priority order where the first
//! matching rule wins:
//!
//! 1. analytics loading → `Loading`
//! 2. analytics active and any valid stream → `Active`
//! 3. video pipeline starting/streaming and no valid stream → `Loading`
//! 4. video pipeline failed and recording → `VideoFailed`
//! 5. recording and no valid stream → `AudioOnly`
//! 6. otherwise → `Inactive`
//!
//! A failed pipeline with nothing recording falls through to `Inactive`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Audio source marker meaning the live microphone is being recorded.
pub const MICROPHONE_SOURCE: &str = "MICROPHONE";

/// Health of the video analysis pipeline, reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Starting,
    Streaming,
    Failed,
    /// Idle or any status string the panel does not act on.
    #[default]
    #[serde(other)]
    Idle,
}

impl VideoStatus {
    /// Parse the backend's status string. Unknown values map to `Idle`.
    #[must_use]
    pub fn from_backend(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "starting" => VideoStatus::Starting,
            "streaming" => VideoStatus::Streaming,
            "failed" => VideoStatus::Failed,
            _ => VideoStatus::Idle,
        }
    }

    /// True while the pipeline is coming up or running.
    #[must_use]
    pub fn is_starting_or_streaming(self) -> bool {
        matches!(self, VideoStatus::Starting | VideoStatus::Streaming)
    }
}

/// Video analytics flags owned by the external store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsSignal {
    pub active: bool,
    pub loading: bool,
}

/// Inputs of the recording indicator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingSources {
    /// Backend AI processing is running.
    pub ai_processing: bool,
    /// Path or marker of the uploaded audio source.
    pub audio_source: Option<String>,
    /// Transcript is being streamed.
    pub transcript_streaming: bool,
    /// Video analytics is active.
    pub analytics_active: bool,
}

impl RecordingSources {
    /// True if any recording source is live.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.ai_processing
            || self.audio_source.as_deref() == Some(MICROPHONE_SOURCE)
            || self.transcript_streaming
            || self.analytics_active
    }
}

/// Everything the status derivation reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSignals {
    /// At least one camera endpoint is valid.
    pub has_valid_streams: bool,
    pub analytics: AnalyticsSignal,
    pub video_status: VideoStatus,
    /// Derived recording indicator.
    pub recording: bool,
}

/// What the stream panel should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    Loading,
    Active,
    AudioOnly,
    VideoFailed,
    Inactive,
}

impl DisplayStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DisplayStatus::Loading => "loading",
            DisplayStatus::Active => "active",
            DisplayStatus::AudioOnly => "audio_only",
            DisplayStatus::VideoFailed => "video_failed",
            DisplayStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive the display status. Pure and total.
#[must_use]
pub fn derive_status(signals: &StreamSignals) -> DisplayStatus {
    if signals.analytics.loading {
        return DisplayStatus::Loading;
    }

    if signals.analytics.active && signals.has_valid_streams {
        return DisplayStatus::Active;
    }

    if signals.video_status.is_starting_or_streaming() && !signals.has_valid_streams {
        return DisplayStatus::Loading;
    }

    if signals.video_status == VideoStatus::Failed && signals.recording {
        return DisplayStatus::VideoFailed;
    }

    if signals.recording && !signals.has_valid_streams {
        return DisplayStatus::AudioOnly;
    }

    DisplayStatus::Inactive
}

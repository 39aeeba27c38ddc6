//! Panel layout selection.
//!
//! Maps the derived display status and the active stream selection to the
//! set of players (or the placeholder) the panel shows. Only valid endpoints
//! ever reach a player.

use crate::endpoint::{StreamEndpoints, StreamRole};
use crate::status::DisplayStatus;
use crate::store::UiState;
use serde::Serialize;

/// A player bound to one camera stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerSlot {
    pub role: StreamRole,
    pub url: String,
    pub label: &'static str,
}

impl PlayerSlot {
    fn for_role(endpoints: &StreamEndpoints, role: StreamRole) -> Option<Self> {
        endpoints.valid_url(role).map(|url| Self {
            role,
            url: url.to_string(),
            label: role.overlay_label(),
        })
    }
}

/// What the stream panel body renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PanelLayout {
    /// Spinner while streams come up.
    Spinner,
    /// Audio recording with no video detected.
    AudioOnly,
    /// Video pipeline failed, audio processing continues.
    VideoFailed,
    /// Nothing running; prompt to configure cameras or upload a file.
    Inactive,
    /// Front camera as the main player, back and board as side players.
    Grid {
        main: Option<PlayerSlot>,
        side: Vec<PlayerSlot>,
    },
    /// A single selected camera.
    Single(PlayerSlot),
    /// Streams are active but the selection points at nothing playable.
    Empty,
}

impl PanelLayout {
    /// Derive the layout from the current UI state.
    #[must_use]
    pub fn from_state(state: &UiState) -> Self {
        Self::derive(state.display_status(), state.active_stream, &state.endpoints)
    }

    #[must_use]
    pub fn derive(
        status: DisplayStatus,
        active_stream: Option<StreamRole>,
        endpoints: &StreamEndpoints,
    ) -> Self {
        match status {
            DisplayStatus::Loading => PanelLayout::Spinner,
            DisplayStatus::AudioOnly => PanelLayout::AudioOnly,
            DisplayStatus::VideoFailed => PanelLayout::VideoFailed,
            DisplayStatus::Inactive => PanelLayout::Inactive,
            DisplayStatus::Active => match active_stream {
                Some(StreamRole::All) => PanelLayout::Grid {
                    main: PlayerSlot::for_role(endpoints, StreamRole::Front),
                    side: [StreamRole::Back, StreamRole::Content]
                        .into_iter()
                        .filter_map(|role| PlayerSlot::for_role(endpoints, role))
                        .collect(),
                },
                Some(role) => PlayerSlot::for_role(endpoints, role)
                    .map_or(PanelLayout::Empty, PanelLayout::Single),
                None => PanelLayout::Empty,
            },
        }
    }

    /// Number of players the layout instantiates.
    #[must_use]
    pub fn player_count(&self) -> usize {
        match self {
            PanelLayout::Grid { main, side } => usize::from(main.is_some()) + side.len(),
            PanelLayout::Single(_) => 1,
            _ => 0,
        }
    }
}

//! Stream registry and validity classification.
//!
//! A stream endpoint is an opaque locator supplied by the external store. It
//! may be absent, blank or malformed; none of those are errors, they simply
//! make the endpoint unusable for playback.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Camera role a stream can be displayed under.
///
/// `All` is a virtual aggregate role with no endpoint of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamRole {
    Front,
    Back,
    Content,
    All,
}

/// Roles backed by a concrete endpoint, in display order.
pub const CAMERA_ROLES: [StreamRole; 3] = [StreamRole::Front, StreamRole::Back, StreamRole::Content];

impl StreamRole {
    /// Wire/string form used by the dashboards.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StreamRole::Front => "front",
            StreamRole::Back => "back",
            StreamRole::Content => "content",
            StreamRole::All => "all",
        }
    }

    /// Returns true for the aggregate role.
    #[must_use]
    pub fn is_virtual(self) -> bool {
        matches!(self, StreamRole::All)
    }

    /// Overlay label shown on top of a player for this role.
    #[must_use]
    pub fn overlay_label(self) -> &'static str {
        match self {
            StreamRole::Front => "Front",
            StreamRole::Back => "Back",
            StreamRole::Content => "Board",
            StreamRole::All => "All",
        }
    }
}

impl fmt::Display for StreamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true if `endpoint` looks like a playable stream locator.
///
/// The classification is a pattern heuristic, not a reachability check. After trimming,
/// the locator must be non-empty and either start with `http` or `rtsp://`, or
/// contain `/stream` or `.m3u8`.
#[must_use]
pub fn is_valid_stream(endpoint: Option<&str>) -> bool {
    let Some(url) = endpoint.map(str::trim) else {
        return false;
    };

    if url.is_empty() {
        return false;
    }

    url.starts_with("http")
        || url.starts_with("rtsp://")
        || url.contains("/stream")
        || url.contains(".m3u8")
}

/// The three camera endpoints held by the external store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEndpoints {
    pub front: Option<String>,
    pub back: Option<String>,
    /// Board camera, displayed under the `content` role.
    pub content: Option<String>,
}

impl StreamEndpoints {
    /// Raw endpoint for a camera role. The virtual `All` role has none.
    #[must_use]
    pub fn get(&self, role: StreamRole) -> Option<&str> {
        match role {
            StreamRole::Front => self.front.as_deref(),
            StreamRole::Back => self.back.as_deref(),
            StreamRole::Content => self.content.as_deref(),
            StreamRole::All => None,
        }
    }

    /// Replace the endpoint for a camera role. Writing to `All` is a no-op.
    pub fn set(&mut self, role: StreamRole, endpoint: Option<String>) {
        match role {
            StreamRole::Front => self.front = endpoint,
            StreamRole::Back => self.back = endpoint,
            StreamRole::Content => self.content = endpoint,
            StreamRole::All => {}
        }
    }

    /// Whether `role` can be displayed. `All` is available when any camera is.
    #[must_use]
    pub fn is_available(&self, role: StreamRole) -> bool {
        match role {
            StreamRole::All => self.has_valid_streams(),
            camera => is_valid_stream(self.get(camera)),
        }
    }

    /// True if at least one camera endpoint is valid.
    #[must_use]
    pub fn has_valid_streams(&self) -> bool {
        CAMERA_ROLES
            .iter()
            .any(|role| is_valid_stream(self.get(*role)))
    }

    /// Camera roles with a valid endpoint, in front → back → content order.
    #[must_use]
    pub fn available_roles(&self) -> Vec<StreamRole> {
        CAMERA_ROLES
            .into_iter()
            .filter(|role| is_valid_stream(self.get(*role)))
            .collect()
    }

    /// Valid endpoint for a camera role, trimmed.
    #[must_use]
    pub fn valid_url(&self, role: StreamRole) -> Option<&str> {
        self.get(role)
            .filter(|url| is_valid_stream(Some(*url)))
            .map(str::trim)
    }
}

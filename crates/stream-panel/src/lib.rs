//! Classroom Stream Panel Library
//!
//! Derived state for the classroom camera panel:
//!
//! - Stream registry and validity classification of camera locators
//! - Display status derivation (loading, active, audio only, video failed, inactive)
//! - Reactive active-stream selection written back to the UI store
//! - Panel layout (which players to show)
//!
//! # Architecture
//!
//! ```text
//! UiStore (watch channel)
//! ├── endpoints ──► is_valid_stream ──► derive_status ──► PanelLayout
//! └── endpoints + analytics.active ──► selector task ──► active_stream (write-back)
//! ```
//!
//! Nothing derived is stored except the active stream selection, which the
//! selector owns.
//!
//! # Modules
//!
//! - [`endpoint`] - Stream roles, endpoints and the validity classifier
//! - [`status`] - Display status derivation
//! - [`store`] - UI state container with change notification
//! - [`selector`] - Active-stream selector
//! - [`layout`] - Panel layout

pub mod endpoint;
pub mod layout;
pub mod selector;
pub mod status;
pub mod store;

pub use endpoint::{is_valid_stream, StreamEndpoints, StreamRole, CAMERA_ROLES};
pub use layout::{PanelLayout, PlayerSlot};
pub use selector::{
    apply_selection, select_active_stream, select_stream, spawn_active_stream_selector,
};
pub use status::{
    derive_status, AnalyticsSignal, DisplayStatus, RecordingSources, StreamSignals, VideoStatus,
    MICROPHONE_SOURCE,
};
pub use store::{UiState, UiStore};

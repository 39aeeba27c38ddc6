//! Transient user notifications.
//!
//! At most one notification is visible. Showing a new one replaces the current
//! one and schedules its own clear; a clear scheduled for an older message
//! leaves a newer message in place.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    /// Marker shown in front of the message.
    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            NotificationKind::Info => "ℹ️",
            NotificationKind::Success => "✅",
            NotificationKind::Warning => "⚠️",
            NotificationKind::Error => "❌",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Increases with every notification shown.
    pub id: u64,
    pub kind: NotificationKind,
    pub message: String,
    /// Time the notification stays visible.
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.icon(), self.message)
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }
}

/// Single-slot notification display.
#[derive(Debug, Clone)]
pub struct NotificationCenter {
    sender: watch::Sender<Option<Notification>>,
    next_id: Arc<AtomicU64>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationCenter {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Currently visible notification.
    #[must_use]
    pub fn current(&self) -> Option<Notification> {
        self.sender.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Notification>> {
        self.sender.subscribe()
    }

    /// Show `message` for `duration`, replacing whatever is visible.
    ///
    /// Returns the handle of the task that clears it. Must be called from
    /// within a Tokio runtime.
    pub fn show(
        &self,
        kind: NotificationKind,
        message: impl Into<String>,
        duration: Duration,
    ) -> JoinHandle<()> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let notification = Notification {
            id,
            kind,
            message: message.into(),
            duration,
        };

        debug!(
            target: "console.notify",
            id,
            kind = ?kind,
            message = %notification.message,
            "Showing notification"
        );
        self.sender.send_replace(Some(notification));

        let center = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            center.clear(id);
        })
    }

    /// Clear the notification with `id` if it is still visible.
    ///
    /// Returns true if it was cleared.
    pub fn clear(&self, id: u64) -> bool {
        self.sender.send_if_modified(|current| {
            if current.as_ref().is_some_and(|n| n.id == id) {
                *current = None;
                true
            } else {
                false
            }
        })
    }

    /// Clear whatever is visible.
    pub fn dismiss(&self) {
        self.sender.send_if_modified(|current| current.take().is_some());
    }
}

//! Live event subscription.
//!
//! Opens the backend's event stream, decodes frames and records each workload
//! event in the console store. Connect and disconnect are separate calls.
//!
//! # Graceful Shutdown
//!
//! [`EventSubscription::disconnect`] cancels the reader task and waits for it
//! to exit. A stream that ends or fails on its own marks the subscription as
//! disconnected in the store; nothing reconnects automatically.

use crate::client::BackendApi;
use crate::observability::metrics;
use crate::sse::{SseDecoder, SseFrame, WorkloadEvent};
use crate::state::{ConsoleAction, ConsoleStore};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Handle to a running subscription task.
#[derive(Debug)]
pub struct EventSubscription {
    url: String,
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl EventSubscription {
    /// Open a subscription to `url` and record its events in `store`.
    ///
    /// The store is marked connected immediately; the stream itself is opened
    /// by the spawned task.
    #[must_use]
    pub fn connect(api: Arc<dyn BackendApi>, url: String, store: ConsoleStore) -> Self {
        let cancel_token = CancellationToken::new();

        store.dispatch(ConsoleAction::Connect { url: url.clone() });
        info!(target: "console.subscription", url = %url, "Connecting to event stream");

        let handle = tokio::spawn(run_subscription(
            api,
            url.clone(),
            store,
            cancel_token.clone(),
        ));

        Self {
            url,
            cancel_token,
            handle,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// True once the reader task exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop reading and wait for the task to exit.
    pub async fn disconnect(self) {
        self.cancel_token.cancel();
        if let Err(e) = self.handle.await {
            warn!(target: "console.subscription", error = %e, "Subscription task failed");
        }
        info!(target: "console.subscription", url = %self.url, "Disconnected from event stream");
    }
}

#[instrument(skip_all, name = "console.subscription", fields(url = %url))]
async fn run_subscription(
    api: Arc<dyn BackendApi>,
    url: String,
    store: ConsoleStore,
    cancel_token: CancellationToken,
) {
    let stream = tokio::select! {
        opened = api.open_events(&url) => opened,
        () = cancel_token.cancelled() => return,
    };

    let mut stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            warn!(target: "console.subscription", error = %e, "Failed to open event stream");
            metrics::record_sse_error("stream_error");
            store.dispatch(ConsoleAction::SubscriptionClosed { url });
            return;
        }
    };

    let mut decoder = SseDecoder::default();

    loop {
        tokio::select! {
            chunk = stream.next_chunk() => match chunk {
                Ok(Some(bytes)) => {
                    let decoded = decoder.push(&bytes);
                    for e in &decoded.errors {
                        warn!(target: "console.subscription", error = %e, "Dropping oversized event");
                        metrics::record_sse_error("frame_too_large");
                    }
                    for frame in &decoded.frames {
                        handle_frame(&store, frame);
                    }
                }
                Ok(None) => {
                    if let Some(frame) = decoder.finish() {
                        handle_frame(&store, &frame);
                    }
                    info!(target: "console.subscription", "Event stream closed by backend");
                    store.dispatch(ConsoleAction::SubscriptionClosed { url });
                    break;
                }
                Err(e) => {
                    warn!(target: "console.subscription", error = %e, "Event stream failed");
                    metrics::record_sse_error("stream_error");
                    store.dispatch(ConsoleAction::SubscriptionClosed { url });
                    break;
                }
            },
            () = cancel_token.cancelled() => {
                debug!(target: "console.subscription", "Subscription cancelled");
                break;
            }
        }
    }
}

fn handle_frame(store: &ConsoleStore, frame: &SseFrame) {
    let event = match WorkloadEvent::from_frame(frame) {
        Ok(event) => event,
        Err(e) => {
            warn!(
                target: "console.subscription",
                error = %e,
                event = ?frame.event,
                "Skipping malformed event"
            );
            metrics::record_sse_error("invalid_event");
            return;
        }
    };

    match store.record_event(&event) {
        Some(workload) => metrics::record_sse_event(workload.as_str()),
        None => metrics::record_sse_event("unknown"),
    }
}

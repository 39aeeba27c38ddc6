//! Companion backend HTTP client.
//!
//! Wraps the backend's REST surface used by the console:
//!
//! - `GET /health` - liveness, any 2xx means alive
//! - `GET /settings` - project settings
//! - `POST /start`, `POST /stop` - workload control, body `{"target": "<id|all>"}`
//! - `GET /events?workloads=...` - Server-Sent Events stream of workload readings
//!
//! Requests are not retried. A failed attempt is returned to the caller.

use crate::observability::metrics;
use crate::workloads::{WorkloadId, WorkloadTarget};
use async_trait::async_trait;
use bytes::Bytes;
use common::config::BackendConfig;
use common::error::ConsoleError;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, trace, warn};

/// Connection timeout for every backend request.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Status value the backend reports for an accepted command.
pub const STATUS_OK: &str = "ok";

/// Project settings served by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "projectName", default)]
    pub project_name: Option<String>,
}

/// Response to a start/stop command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CommandResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: STATUS_OK.to_string(),
            message: None,
        }
    }

    /// True if the backend accepted the command.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

#[derive(Debug, Serialize)]
struct CommandRequest {
    target: WorkloadTarget,
}

/// Kind of workload command, used for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
}

impl Command {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Stop => "stop",
        }
    }
}

/// Body of an open event subscription, read chunk by chunk.
#[async_trait]
pub trait EventStream: Send {
    /// Next body chunk, or `None` once the backend closed the stream.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, ConsoleError>;
}

/// Trait for backend operations (enables mocking).
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// Check backend liveness.
    async fn health(&self) -> Result<(), ConsoleError>;

    /// Fetch project settings.
    async fn settings(&self) -> Result<Settings, ConsoleError>;

    /// Start the given workloads.
    async fn start(&self, target: WorkloadTarget) -> Result<CommandResponse, ConsoleError>;

    /// Stop the given workloads.
    async fn stop(&self, target: WorkloadTarget) -> Result<CommandResponse, ConsoleError>;

    /// URL of the event stream carrying readings for `workloads`.
    fn events_url(&self, workloads: &[WorkloadId]) -> String;

    /// Open the event stream at `url`.
    async fn open_events(&self, url: &str) -> Result<Box<dyn EventStream>, ConsoleError>;
}

/// Build the event stream URL for `workloads` under `base_url`.
#[must_use]
pub fn events_url(config: &BackendConfig, workloads: &[WorkloadId]) -> String {
    let ids: Vec<&str> = workloads.iter().map(|id| id.as_str()).collect();
    format!("{}?workloads={}", config.url("events"), ids.join(","))
}

/// Backend client over HTTP.
pub struct HttpBackendClient {
    config: BackendConfig,
    /// Client for request/response calls, bounded by the configured timeout.
    http: reqwest::Client,
    /// Client for the long-lived event stream; only the connect phase is bounded.
    streaming: reqwest::Client,
}

impl HttpBackendClient {
    /// Create a client for the backend described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `ConsoleError::Configuration` if the HTTP client cannot be built.
    pub fn new(config: BackendConfig) -> Result<Self, ConsoleError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ConsoleError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        let streaming = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| {
                ConsoleError::Configuration(format!("Failed to build streaming client: {e}"))
            })?;

        Ok(Self {
            config,
            http,
            streaming,
        })
    }

    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    #[instrument(skip_all, fields(command = command.as_str(), target = %target))]
    async fn send_command(
        &self,
        command: Command,
        target: WorkloadTarget,
    ) -> Result<CommandResponse, ConsoleError> {
        let url = self.config.url(command.as_str());
        let started = Instant::now();

        debug!(target: "console.client", url = %url, "Sending workload command");

        let result = async {
            let response = self
                .http
                .post(&url)
                .json(&CommandRequest { target })
                .send()
                .await
                .map_err(|e| {
                    warn!(target: "console.client", error = %e, "Workload command request failed");
                    ConsoleError::Http(e.to_string())
                })?;

            let response = check_status(response).await?;

            response.json::<CommandResponse>().await.map_err(|e| {
                warn!(target: "console.client", error = %e, "Failed to parse command response");
                ConsoleError::InvalidResponse(e.to_string())
            })
        }
        .await;

        metrics::record_command_duration(command.as_str(), started.elapsed());
        result
    }
}

/// Map a non-2xx response to `UnexpectedStatus`, keeping the body for diagnostics.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ConsoleError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_else(|e| {
        trace!(target: "console.client", error = %e, "Failed to read error response body");
        String::new()
    });
    warn!(target: "console.client", status = %status, "Backend returned error status");

    Err(ConsoleError::UnexpectedStatus {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl BackendApi for HttpBackendClient {
    async fn health(&self) -> Result<(), ConsoleError> {
        let response = self
            .http
            .get(self.config.url("health"))
            .send()
            .await
            .map_err(|e| {
                debug!(target: "console.client", error = %e, "Health check request failed");
                ConsoleError::Http(e.to_string())
            })?;

        check_status(response).await.map(|_| ())
    }

    async fn settings(&self) -> Result<Settings, ConsoleError> {
        let response = self
            .http
            .get(self.config.url("settings"))
            .send()
            .await
            .map_err(|e| ConsoleError::Http(e.to_string()))?;

        let response = check_status(response).await?;

        response
            .json::<Settings>()
            .await
            .map_err(|e| ConsoleError::InvalidResponse(e.to_string()))
    }

    async fn start(&self, target: WorkloadTarget) -> Result<CommandResponse, ConsoleError> {
        self.send_command(Command::Start, target).await
    }

    async fn stop(&self, target: WorkloadTarget) -> Result<CommandResponse, ConsoleError> {
        self.send_command(Command::Stop, target).await
    }

    fn events_url(&self, workloads: &[WorkloadId]) -> String {
        events_url(&self.config, workloads)
    }

    async fn open_events(&self, url: &str) -> Result<Box<dyn EventStream>, ConsoleError> {
        let response = self
            .streaming
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| {
                warn!(target: "console.client", error = %e, url = %url, "Failed to open event stream");
                ConsoleError::Subscription(e.to_string())
            })?;

        let response = check_status(response).await?;
        Ok(Box::new(HttpEventStream { response }))
    }
}

struct HttpEventStream {
    response: reqwest::Response,
}

#[async_trait]
impl EventStream for HttpEventStream {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, ConsoleError> {
        self.response
            .chunk()
            .await
            .map_err(|e| ConsoleError::Subscription(e.to_string()))
    }
}

/// Mock backend module for testing.
///
/// This module provides a scriptable in-memory backend for unit tests.
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted reply to a start/stop command.
    #[derive(Debug, Clone)]
    pub enum MockReply {
        /// Backend answers with this status field.
        Status(String),
        /// Backend answers with a non-2xx HTTP status.
        HttpStatus(u16),
        /// Request never reaches the backend.
        TransportError,
    }

    impl MockReply {
        #[must_use]
        pub fn ok() -> Self {
            MockReply::Status(STATUS_OK.to_string())
        }

        fn to_result(&self) -> Result<CommandResponse, ConsoleError> {
            match self {
                MockReply::Status(status) => Ok(CommandResponse {
                    status: status.clone(),
                    message: None,
                }),
                MockReply::HttpStatus(status) => Err(ConsoleError::UnexpectedStatus {
                    status: *status,
                    body: String::new(),
                }),
                MockReply::TransportError => {
                    Err(ConsoleError::Http("Mock backend unreachable".to_string()))
                }
            }
        }
    }

    /// Mock backend for unit testing.
    pub struct MockBackend {
        /// Number of failing health checks before the backend becomes healthy.
        unhealthy_checks: usize,
        /// Health checks never answer.
        health_hangs: bool,
        /// Project name served by `/settings`; `None` makes the call fail.
        project_name: Option<String>,
        start_reply: MockReply,
        /// Replies served before `start_reply`, oldest first.
        queued_start_replies: Mutex<VecDeque<MockReply>>,
        stop_reply: MockReply,
        /// Chunks served on the event stream before it idles.
        event_chunks: Vec<Bytes>,
        /// Close the event stream after the scripted chunks instead of idling.
        close_events: bool,
        health_calls: AtomicUsize,
        settings_calls: AtomicUsize,
        start_calls: AtomicUsize,
        stop_calls: AtomicUsize,
        open_event_calls: AtomicUsize,
    }

    impl Default for MockBackend {
        fn default() -> Self {
            Self::healthy()
        }
    }

    impl MockBackend {
        /// A healthy backend that accepts every command.
        #[must_use]
        pub fn healthy() -> Self {
            Self {
                unhealthy_checks: 0,
                health_hangs: false,
                project_name: Some("Health AI Suite".to_string()),
                start_reply: MockReply::ok(),
                queued_start_replies: Mutex::new(VecDeque::new()),
                stop_reply: MockReply::ok(),
                event_chunks: Vec::new(),
                close_events: false,
                health_calls: AtomicUsize::new(0),
                settings_calls: AtomicUsize::new(0),
                start_calls: AtomicUsize::new(0),
                stop_calls: AtomicUsize::new(0),
                open_event_calls: AtomicUsize::new(0),
            }
        }

        /// Fail the first `checks` health checks.
        #[must_use]
        pub fn unhealthy_for(mut self, checks: usize) -> Self {
            self.unhealthy_checks = checks;
            self
        }

        /// Never become healthy.
        #[must_use]
        pub fn never_healthy(self) -> Self {
            self.unhealthy_for(usize::MAX)
        }

        /// Health checks never complete.
        #[must_use]
        pub fn with_hanging_health(mut self) -> Self {
            self.health_hangs = true;
            self
        }

        #[must_use]
        pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
            self.project_name = Some(name.into());
            self
        }

        /// Make `/settings` fail.
        #[must_use]
        pub fn with_settings_failure(mut self) -> Self {
            self.project_name = None;
            self
        }

        #[must_use]
        pub fn with_start_reply(mut self, reply: MockReply) -> Self {
            self.start_reply = reply;
            self
        }

        /// Answer successive starts with `replies`, then with the default reply.
        #[must_use]
        pub fn with_start_replies(self, replies: Vec<MockReply>) -> Self {
            if let Ok(mut queue) = self.queued_start_replies.lock() {
                queue.extend(replies);
            }
            self
        }

        #[must_use]
        pub fn with_stop_reply(mut self, reply: MockReply) -> Self {
            self.stop_reply = reply;
            self
        }

        /// Serve `chunks` on the event stream.
        #[must_use]
        pub fn with_event_chunks(mut self, chunks: Vec<Bytes>) -> Self {
            self.event_chunks = chunks;
            self
        }

        /// End the event stream after the scripted chunks.
        #[must_use]
        pub fn closing_events(mut self) -> Self {
            self.close_events = true;
            self
        }

        pub fn health_calls(&self) -> usize {
            self.health_calls.load(Ordering::SeqCst)
        }

        pub fn settings_calls(&self) -> usize {
            self.settings_calls.load(Ordering::SeqCst)
        }

        pub fn start_calls(&self) -> usize {
            self.start_calls.load(Ordering::SeqCst)
        }

        pub fn stop_calls(&self) -> usize {
            self.stop_calls.load(Ordering::SeqCst)
        }

        pub fn open_event_calls(&self) -> usize {
            self.open_event_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BackendApi for MockBackend {
        async fn health(&self) -> Result<(), ConsoleError> {
            let count = self.health_calls.fetch_add(1, Ordering::SeqCst);
            if self.health_hangs {
                std::future::pending::<()>().await;
            }
            if count < self.unhealthy_checks {
                return Err(ConsoleError::Http("Mock backend not ready".to_string()));
            }
            Ok(())
        }

        async fn settings(&self) -> Result<Settings, ConsoleError> {
            self.settings_calls.fetch_add(1, Ordering::SeqCst);
            match &self.project_name {
                Some(name) => Ok(Settings {
                    project_name: Some(name.clone()),
                }),
                None => Err(ConsoleError::UnexpectedStatus {
                    status: 500,
                    body: "settings unavailable".to_string(),
                }),
            }
        }

        async fn start(&self, _target: WorkloadTarget) -> Result<CommandResponse, ConsoleError> {
            self.start_calls.fetch_add(1, Ordering::SeqCst);
            let queued = self
                .queued_start_replies
                .lock()
                .ok()
                .and_then(|mut queue| queue.pop_front());
            queued.as_ref().unwrap_or(&self.start_reply).to_result()
        }

        async fn stop(&self, _target: WorkloadTarget) -> Result<CommandResponse, ConsoleError> {
            self.stop_calls.fetch_add(1, Ordering::SeqCst);
            self.stop_reply.to_result()
        }

        fn events_url(&self, workloads: &[WorkloadId]) -> String {
            events_url(&BackendConfig::new("http://mock-backend"), workloads)
        }

        async fn open_events(&self, _url: &str) -> Result<Box<dyn EventStream>, ConsoleError> {
            self.open_event_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MockEventStream {
                chunks: self.event_chunks.iter().cloned().collect(),
                close_when_drained: self.close_events,
            }))
        }
    }

    struct MockEventStream {
        chunks: VecDeque<Bytes>,
        close_when_drained: bool,
    }

    #[async_trait]
    impl EventStream for MockEventStream {
        async fn next_chunk(&mut self) -> Result<Option<Bytes>, ConsoleError> {
            if let Some(chunk) = self.chunks.pop_front() {
                return Ok(Some(chunk));
            }
            if self.close_when_drained {
                return Ok(None);
            }
            // A live stream with nothing to say
            std::future::pending::<()>().await;
            Ok(None)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HttpBackendClient {
        HttpBackendClient::new(
            BackendConfig::new(server.uri()).with_http_timeout(Duration::from_millis(500)),
        )
        .unwrap()
    }

    #[test]
    fn test_events_url_lists_workloads_in_order() {
        let config = BackendConfig::new("http://localhost:5001/");
        assert_eq!(
            events_url(&config, &WorkloadId::ALL),
            "http://localhost:5001/events?workloads=rppg,ai-ecg,mdpnp,3d-pose"
        );
    }

    #[test]
    fn test_command_response_ok_is_exact() {
        assert!(CommandResponse::ok().is_ok());
        let resp: CommandResponse = serde_json::from_str(r#"{"status":"OK"}"#).unwrap();
        assert!(!resp.is_ok());
    }

    #[tokio::test]
    async fn test_health_success_and_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503).set_body_string("warming up"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.health().await.is_ok());
        assert_eq!(
            client.health().await.unwrap_err(),
            ConsoleError::UnexpectedStatus {
                status: 503,
                body: "warming up".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let client = HttpBackendClient::new(
            BackendConfig::new("http://127.0.0.1:1").with_http_timeout(Duration::from_millis(200)),
        )
        .unwrap();
        assert!(client.health().await.unwrap_err().is_transport());
    }

    #[tokio::test]
    async fn test_settings_reads_project_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/settings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "projectName": "Cardiology Ward",
                "theme": "dark"
            })))
            .mount(&server)
            .await;

        let settings = client_for(&server).settings().await.unwrap();
        assert_eq!(settings.project_name.as_deref(), Some("Cardiology Ward"));
    }

    #[tokio::test]
    async fn test_start_posts_target_and_parses_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/start"))
            .and(body_json(serde_json::json!({ "target": "all" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server).start(WorkloadTarget::All).await.unwrap();
        assert!(response.is_ok());
    }

    #[tokio::test]
    async fn test_stop_single_workload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stop"))
            .and(body_json(serde_json::json!({ "target": "ai-ecg" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "error",
                "message": "not running"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server)
            .stop(WorkloadTarget::One(WorkloadId::AiEcg))
            .await
            .unwrap();
        assert!(!response.is_ok());
        assert_eq!(response.message.as_deref(), Some("not running"));
    }

    #[tokio::test]
    async fn test_garbage_command_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/start"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).start(WorkloadTarget::All).await.unwrap_err();
        assert!(matches!(err, ConsoleError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_open_events_streams_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .and(query_param("workloads", "rppg,mdpnp"))
            .and(header("accept", "text/event-stream"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string("data: {}\n\n"),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let url = client.events_url(&[WorkloadId::Rppg, WorkloadId::Mdpnp]);
        let mut stream = client.open_events(&url).await.unwrap();

        let mut body = Vec::new();
        while let Some(chunk) = stream.next_chunk().await.unwrap() {
            body.extend_from_slice(&chunk);
        }
        assert_eq!(body, b"data: {}\n\n");
    }

    #[tokio::test]
    async fn test_open_events_rejected_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let url = client.events_url(&WorkloadId::ALL);
        let result = client.open_events(&url).await;
        assert!(matches!(
            result,
            Err(ConsoleError::UnexpectedStatus { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_mock_backend_scripts_health_and_replies() {
        use mock::{MockBackend, MockReply};

        let backend = MockBackend::healthy()
            .unhealthy_for(2)
            .with_start_reply(MockReply::Status("busy".to_string()))
            .with_stop_reply(MockReply::TransportError);

        assert!(backend.health().await.is_err());
        assert!(backend.health().await.is_err());
        assert!(backend.health().await.is_ok());
        assert_eq!(backend.health_calls(), 3);

        assert!(!backend.start(WorkloadTarget::All).await.unwrap().is_ok());
        assert!(backend.stop(WorkloadTarget::All).await.unwrap_err().is_transport());
        assert_eq!(backend.start_calls(), 1);
        assert_eq!(backend.stop_calls(), 1);
    }
}

//! Fake companion backend
//!
//! Wraps a wiremock server with helpers for the endpoints the console uses:
//! `GET /health`, `GET /settings`, `POST /start`, `POST /stop` and
//! `GET /events`.

use common::config::BackendConfig;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Fake backend for integration tests.
///
/// # Example
/// ```rust,ignore
/// let backend = FakeBackend::start().await;
/// backend.mount_health(200).await;
/// backend.mount_settings("Cardiology Ward").await;
///
/// let config = backend.backend_config();
/// ```
pub struct FakeBackend {
    server: MockServer,
}

impl FakeBackend {
    /// Start a fake backend on a random local port.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL of the fake backend.
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Backend configuration pointing at this server, with a short timeout.
    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig::new(self.uri()).with_http_timeout(Duration::from_secs(2))
    }

    /// Access the underlying wiremock server for custom mocks.
    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// Answer `GET /health` with `status`.
    pub async fn mount_health(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Answer `GET /health` with 503 for the first `times` checks.
    ///
    /// Mount a healthy response afterwards to take over once these are used up.
    pub async fn mount_unhealthy_for(&self, times: u64) {
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(times)
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    /// Answer `GET /settings` with `project_name`.
    pub async fn mount_settings(&self, project_name: &str) {
        Mock::given(method("GET"))
            .and(path("/settings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "projectName": project_name
            })))
            .mount(&self.server)
            .await;
    }

    /// Answer `GET /settings` with a server error.
    pub async fn mount_settings_failure(&self) {
        Mock::given(method("GET"))
            .and(path("/settings"))
            .respond_with(ResponseTemplate::new(500).set_body_string("settings unavailable"))
            .mount(&self.server)
            .await;
    }

    /// Answer `POST /start` with a 200 carrying `status`.
    pub async fn mount_start(&self, status: &str) {
        self.mount_command("/start", ResponseTemplate::new(200).set_body_json(command_body(status)))
            .await;
    }

    /// Answer `POST /start` with an HTTP error.
    pub async fn mount_start_http_error(&self, http_status: u16) {
        self.mount_command(
            "/start",
            ResponseTemplate::new(http_status).set_body_string("start failed"),
        )
        .await;
    }

    /// Answer `POST /stop` with a 200 carrying `status`.
    pub async fn mount_stop(&self, status: &str) {
        self.mount_command("/stop", ResponseTemplate::new(200).set_body_json(command_body(status)))
            .await;
    }

    /// Answer `GET /events` with `body` as an event stream, then close it.
    pub async fn mount_events(&self, body: String) {
        Mock::given(method("GET"))
            .and(path("/events"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&self.server)
            .await;
    }

    async fn mount_command(&self, command_path: &str, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(command_path))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// Requests received on `request_path`, oldest first.
    pub async fn requests_to(&self, request_path: &str) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == request_path)
            .collect()
    }

    /// JSON bodies of the commands received on `request_path`.
    pub async fn command_bodies(&self, request_path: &str) -> Vec<Value> {
        self.requests_to(request_path)
            .await
            .iter()
            .map(|r| serde_json::from_slice(&r.body).expect("command body should be JSON"))
            .collect()
    }
}

fn command_body(status: &str) -> Value {
    json!({ "status": status, "message": format!("command {status}") })
}

/// One SSE frame carrying a workload reading.
pub fn sse_event(workload: &str, data: Value) -> String {
    let payload = json!({
        "workload": workload,
        "timestamp": 1_700_000_000,
        "data": data,
    });
    format!("data: {payload}\n\n")
}

/// An SSE body made of `frames`, preceded by a keep-alive comment.
pub fn sse_body(frames: &[String]) -> String {
    let mut body = String::from(": keep-alive\n\n");
    for frame in frames {
        body.push_str(frame);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_event_format() {
        let frame = sse_event("rppg", json!({ "HR": 72 }));
        assert!(frame.starts_with("data: {"));
        assert!(frame.ends_with("\n\n"));

        let payload: Value =
            serde_json::from_str(frame.trim_start_matches("data: ").trim_end()).unwrap();
        assert_eq!(payload.get("workload"), Some(&json!("rppg")));
        assert_eq!(payload.pointer("/data/HR"), Some(&json!(72)));
    }

    #[tokio::test]
    async fn test_fake_backend_serves_health_and_settings() {
        let backend = FakeBackend::start().await;
        backend.mount_health(200).await;
        backend.mount_settings("Ward 7").await;

        assert_eq!(backend.backend_config().base_url, backend.uri());
        assert!(backend.requests_to("/health").await.is_empty());
    }
}

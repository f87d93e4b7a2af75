//! Integration tests for Libertad Hub.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p libertad-hub-integration-tests
//! ```
//!
//! Everything runs in-process: [`MockJsonBin`] stands in for the hosted
//! document store and [`TestHub`] serves the hub's own router on an
//! ephemeral port.
//!
//! # Test Categories
//!
//! - `jsonbin_client` - Wire behaviour of the JSONBin client
//! - `controller_sync` - Controller against real HTTP and on-disk storage
//! - `hub_api` - JSON API status codes and payloads

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use libertad_hub::config::RemoteConfig;
use libertad_hub::store::{JsonBinClient, KeyValueStore, LocalStore, MemoryStore};
use libertad_hub::{AppController, AppState, HubController, routes};

/// Master key accepted by [`MockJsonBin`].
pub const MASTER_KEY: &str = "$2a$10$Qm9ndXNUZXN0S2V5Rm9ySW50ZWdyYXRpb24";

/// Document id served by [`MockJsonBin`].
pub const BIN_ID: &str = "6650f0c2acd3cb34a84f5a1b";

/// One request seen by the mock.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub master_key: Option<String>,
    pub content_type: Option<String>,
    pub body: Option<Value>,
}

#[derive(Default)]
struct MockInner {
    record: Option<Value>,
    fail_status: Option<u16>,
    requests: Vec<RecordedRequest>,
}

#[derive(Clone, Default)]
struct MockState {
    inner: Arc<Mutex<MockInner>>,
}

impl MockState {
    fn lock(&self) -> std::sync::MutexGuard<'_, MockInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-process stand-in for the JSONBin v3 document API.
///
/// Serves `GET /v3/b/{bin}/latest` and `PUT /v3/b/{bin}` for [`BIN_ID`],
/// checks `X-Master-Key` against [`MASTER_KEY`] and records every request.
pub struct MockJsonBin {
    addr: SocketAddr,
    state: MockState,
    server: JoinHandle<()>,
}

impl MockJsonBin {
    /// Start with no stored record (reads answer 404).
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new()
            .route("/v3/b/{bin}/latest", get(mock_latest))
            .route("/v3/b/{bin}", put(mock_overwrite))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock JSONBin");
        let addr = listener.local_addr().expect("Mock JSONBin has no address");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Mock JSONBin failed");
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// Start already holding `record`.
    pub async fn with_record(record: Value) -> Self {
        let mock = Self::start().await;
        mock.set_record(record);
        mock
    }

    /// Document API base, as configured through `JSONBIN_BASE_URL`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/v3/b", self.addr)
    }

    /// Remote configuration pointing at this mock with the right key.
    #[must_use]
    pub fn remote_config(&self) -> RemoteConfig {
        self.remote_config_with_key(MASTER_KEY)
    }

    /// Remote configuration pointing at this mock with an arbitrary key.
    #[must_use]
    pub fn remote_config_with_key(&self, key: &str) -> RemoteConfig {
        RemoteConfig::new(&self.base_url(), BIN_ID, SecretString::from(key))
            .expect("Mock remote config is valid")
    }

    /// A client for this mock.
    #[must_use]
    pub fn client(&self) -> JsonBinClient {
        JsonBinClient::new(&self.remote_config()).expect("Failed to build JSONBin client")
    }

    pub fn set_record(&self, record: Value) {
        self.state.lock().record = Some(record);
    }

    /// Currently stored record.
    #[must_use]
    pub fn record(&self) -> Option<Value> {
        self.state.lock().record.clone()
    }

    /// Answer every request with `status` from now on.
    pub fn fail_with(&self, status: u16) {
        self.state.lock().fail_status = Some(status);
    }

    pub fn recover(&self) {
        self.state.lock().fail_status = None;
    }

    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    /// Bodies of all overwrite requests, oldest first.
    #[must_use]
    pub fn puts(&self) -> Vec<Value> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == "PUT")
            .filter_map(|r| r.body)
            .collect()
    }

    /// Poll until `count` overwrites have arrived or `timeout` passes.
    pub async fn wait_for_puts(&self, count: usize, timeout: Duration) -> Vec<Value> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let puts = self.puts();
            if puts.len() >= count || tokio::time::Instant::now() >= deadline {
                return puts;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Drop for MockJsonBin {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn record_request(state: &MockState, method: &'static str, headers: &HeaderMap, body: Option<Value>) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };
    state.lock().requests.push(RecordedRequest {
        method,
        master_key: header("x-master-key"),
        content_type: header("content-type"),
        body,
    });
}

fn rejection(state: &MockState, bin: &str, headers: &HeaderMap) -> Option<Response> {
    if let Some(status) = state.lock().fail_status {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return Some((status, Json(json!({ "message": "Mock failure" }))).into_response());
    }
    let key = headers.get("x-master-key").and_then(|v| v.to_str().ok());
    if key != Some(MASTER_KEY) {
        return Some(
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "Invalid X-Master-Key provided" })),
            )
                .into_response(),
        );
    }
    if bin != BIN_ID {
        return Some(
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": "Bin not found" })),
            )
                .into_response(),
        );
    }
    None
}

fn metadata(bin: &str) -> Value {
    json!({ "id": bin, "private": true })
}

async fn mock_latest(
    State(state): State<MockState>,
    Path(bin): Path<String>,
    headers: HeaderMap,
) -> Response {
    record_request(&state, "GET", &headers, None);
    if let Some(response) = rejection(&state, &bin, &headers) {
        return response;
    }

    let record = state.lock().record.clone();
    match record {
        Some(record) => Json(json!({ "record": record, "metadata": metadata(&bin) })).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Bin not found or it doesn't belong to your account" })),
        )
            .into_response(),
    }
}

async fn mock_overwrite(
    State(state): State<MockState>,
    Path(bin): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record_request(&state, "PUT", &headers, Some(body.clone()));
    if let Some(response) = rejection(&state, &bin, &headers) {
        return response;
    }

    state.lock().record = Some(body.clone());
    Json(json!({ "record": body, "metadata": { "parentId": bin, "private": true } })).into_response()
}

/// The hub router served on an ephemeral port, backed by in-memory local
/// storage and a [`MockJsonBin`].
pub struct TestHub {
    pub base_url: String,
    pub controller: HubController,
    pub kv: Arc<MemoryStore>,
    pub remote: MockJsonBin,
    pub client: reqwest::Client,
    server: JoinHandle<()>,
}

impl TestHub {
    /// Start against an empty remote document.
    pub async fn start() -> Self {
        Self::start_with(MockJsonBin::with_record(json!({})).await, Duration::from_millis(50))
            .await
    }

    /// Start against a prepared mock with the given debounce delay.
    pub async fn start_with(remote: MockJsonBin, save_delay: Duration) -> Self {
        let kv = Arc::new(MemoryStore::new());
        let shared: Arc<dyn KeyValueStore> = kv.clone();
        let controller =
            AppController::start(LocalStore::new(shared), remote.client(), save_delay).await;

        let app = routes::router(AppState::new(controller.clone()));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind hub");
        let addr = listener.local_addr().expect("Hub has no address");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Hub server failed");
        });

        Self {
            base_url: format!("http://{addr}"),
            controller,
            kv,
            remote,
            client: reqwest::Client::new(),
            server,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Local store view over the hub's in-memory storage.
    #[must_use]
    pub fn local(&self) -> LocalStore<Arc<MemoryStore>> {
        LocalStore::new(Arc::clone(&self.kv))
    }
}

impl Drop for TestHub {
    fn drop(&mut self) {
        self.server.abort();
    }
}

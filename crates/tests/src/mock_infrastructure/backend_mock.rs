//! Local submit API stand-in.
//!
//! Unlike mockito, the handler can hold a response back for a fixed delay and every
//! request is recorded with the peer address it arrived on, which makes timeouts and
//! keep-alive reuse observable.

use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    Router,
};
use std::{
    collections::HashSet,
    net::SocketAddr,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tokio::{net::TcpListener, task::JoinHandle};

/// How the mock answers every request.
#[derive(Debug, Clone)]
pub struct BackendBehavior {
    pub status: StatusCode,
    pub delay: Duration,
    pub body: String,
}

impl BackendBehavior {
    /// Immediate `202 Accepted` with an empty body.
    #[must_use]
    pub fn accepting() -> Self {
        Self { status: StatusCode::ACCEPTED, delay: Duration::ZERO, body: String::new() }
    }

    /// Immediate response with `status` and `body`.
    #[must_use]
    pub fn responding(status: StatusCode, body: &str) -> Self {
        Self { status, delay: Duration::ZERO, body: body.to_string() }
    }

    /// Holds each response back for `delay` before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A request as the mock saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub peer: SocketAddr,
    pub path: String,
    pub content_type: Option<String>,
    pub body: Bytes,
}

struct BackendState {
    behavior: BackendBehavior,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl BackendState {
    fn requests(&self) -> std::sync::MutexGuard<'_, Vec<RecordedRequest>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An HTTP/1.1 listener on an ephemeral loopback port. Stops when dropped.
pub struct MockBackend {
    addr: SocketAddr,
    state: Arc<BackendState>,
    task: JoinHandle<()>,
}

impl MockBackend {
    /// Starts a mock answering every method and path with `behavior`.
    ///
    /// # Panics
    ///
    /// Panics if no loopback port can be bound.
    #[allow(clippy::expect_used)]
    pub async fn start(behavior: BackendBehavior) -> Self {
        let listener =
            TcpListener::bind("127.0.0.1:0").await.expect("failed to bind mock backend");
        let addr = listener.local_addr().expect("mock backend has no local address");

        let state = Arc::new(BackendState { behavior, requests: Mutex::new(Vec::new()) });
        let app = Router::new().fallback(record).with_state(Arc::clone(&state));

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .await;
        });

        Self { addr, state, task }
    }

    /// Starts a mock that accepts everything immediately.
    pub async fn accepting() -> Self {
        Self::start(BackendBehavior::accepting()).await
    }

    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}/api/submit/tx", self.addr)
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        self.state.requests().len()
    }

    /// Number of distinct client connections that carried at least one request.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.state.requests().iter().map(|r| r.peer).collect::<HashSet<_>>().len()
    }

    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests().clone()
    }

    /// Polls until at least `count` requests arrived or `within` elapsed.
    pub async fn wait_for_requests(&self, count: usize, within: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + within;
        while tokio::time::Instant::now() < deadline {
            if self.request_count() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.request_count() >= count
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn record(
    State(state): State<Arc<BackendState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    uri: axum::http::Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let content_type =
        headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).map(str::to_string);
    state.requests().push(RecordedRequest {
        peer,
        path: uri.path().to_string(),
        content_type,
        body,
    });

    if !state.behavior.delay.is_zero() {
        tokio::time::sleep(state.behavior.delay).await;
    }

    (state.behavior.status, state.behavior.body.clone())
}

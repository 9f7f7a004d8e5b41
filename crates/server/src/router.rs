use axum::{
    body::Body,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{debug, error};
use txmirror_core::{
    engine::{SubmitEngine, SubmitError},
    metrics::SubmissionResult,
};

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: SubmitEngine,
    pub max_body_bytes: usize,
}

impl AppState {
    #[must_use]
    pub fn new(engine: SubmitEngine, max_body_bytes: usize) -> Arc<Self> {
        Arc::new(Self { engine, max_body_bytes })
    }
}

/// Accepts a raw CBOR transaction and answers with its id once the fan-out started.
///
/// Deliveries continue after the response is sent; their results are only logged.
pub async fn handle_submit_tx(State(state): State<Arc<AppState>>, body: Body) -> Response {
    if let Err(e) = state.engine.ensure_backends() {
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    let raw = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(raw) => raw,
        Err(e) => {
            error!(error = %e, "failed to read request body: {e}");
            state.engine.metrics().record_submission(SubmissionResult::BodyError);
            return (StatusCode::INTERNAL_SERVER_ERROR, "failed to read request body")
                .into_response();
        }
    };

    debug!("transaction dump: {}", hex::encode(&raw));

    match state.engine.submit(raw) {
        Ok(resolved) => (StatusCode::ACCEPTED, resolved.id.to_string()).into_response(),
        Err(e @ SubmitError::NoBackends) => {
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
        Err(e @ SubmitError::Resolve(_)) => {
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

#[allow(clippy::unused_async)]
pub async fn handle_healthcheck() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "failed": false })))
}

#[allow(clippy::unused_async)]
pub async fn handle_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        state.engine.metrics().render(),
    )
}

//! Request ids for access logging.
//!
//! Each request gets an `x-request-id` (kept when the client sent one, UUID v4
//! otherwise). The id is echoed on the response and recorded on the request span.

use axum::http::{header::HeaderValue, HeaderName, Request};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tracing::Span;
use uuid::Uuid;

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates UUID v4 request ids.
#[derive(Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        Some(RequestId::new(HeaderValue::from_str(&id).ok()?))
    }
}

/// Returns the layer that assigns ids and the one that copies them to responses.
///
/// Apply the propagate layer first and the set layer last so the id exists before the
/// trace span is created.
#[must_use]
pub fn request_id_layers() -> (SetRequestIdLayer<UuidRequestId>, PropagateRequestIdLayer) {
    (
        SetRequestIdLayer::new(X_REQUEST_ID.clone(), UuidRequestId),
        PropagateRequestIdLayer::new(X_REQUEST_ID.clone()),
    )
}

/// Span used by the access log, carrying the request id.
pub fn make_request_span<B>(request: &Request<B>) -> Span {
    let request_id =
        request.headers().get(&X_REQUEST_ID).and_then(|v| v.to_str().ok()).unwrap_or("-");

    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

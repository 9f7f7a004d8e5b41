use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{
    middleware::{make_request_span, request_id_layers},
    router::{self, AppState},
};

pub const SUBMIT_PATH: &str = "/api/submit/tx";

/// Builds the full application: routes plus the shared layer stack.
pub fn create_app(state: Arc<AppState>) -> Router {
    with_layers(routes(state))
}

fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(SUBMIT_PATH, post(router::handle_submit_tx))
        .route("/healthcheck", get(router::handle_healthcheck))
        .route("/metrics", get(router::handle_metrics))
        .with_state(state)
}

/// Wraps `router` in request-id, access log, CORS and panic recovery layers.
///
/// The last layer added runs first: the request id is set before the trace span reads
/// it, and a panic anywhere below becomes a 500 response.
pub fn with_layers(router: Router) -> Router {
    let (set_request_id, propagate_request_id) = request_id_layers();

    router
        .layer(CatchPanicLayer::new())
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(make_request_span::<axum::body::Body>)
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(propagate_request_id)
        .layer(set_request_id)
}

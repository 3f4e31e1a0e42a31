use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use nagriksetu_intake::IngestionGateway;

pub mod rest;

/// Largest request body accepted, photo included.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub struct AppState {
    pub gateway: IngestionGateway,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/api/report", post(rest::report::api_report))
        .route("/api/tickets", get(rest::api_tickets))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        // Mobile and web clients are served from other origins
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE]),
        )
        // Method + path only, no query params or client address
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
}

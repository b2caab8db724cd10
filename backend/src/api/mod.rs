//! API module
//!
//! Contains the HTTP request handlers and assembles them into the router

pub mod health;
pub mod middleware;
pub mod separate;

use crate::separation::layout::OUTPUTS_MOUNT;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

/// Build the application router
///
/// Routes:
/// - `GET /` status message
/// - `GET /api/health` liveness
/// - `POST /separate` multipart upload
/// - `GET /outputs/...` produced stems, served from the outputs directory
pub fn router(state: AppState) -> Router {
    let outputs = ServeDir::new(state.config.storage.output_dir());
    let body_limit = state.config.server.max_upload_bytes;

    Router::new()
        .route("/", get(health::root))
        .route("/api/health", get(health::health_check))
        .route("/separate", post(separate::separate))
        .nest_service(OUTPUTS_MOUNT, outputs)
        .layer(DefaultBodyLimit::max(body_limit))
        // Middleware (order matters - request_id should be first)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

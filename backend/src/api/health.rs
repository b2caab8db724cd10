//! Status endpoints
//!
//! Neither endpoint touches the separation tool; they answer as long as the
//! server is up.

use axum::Json;
use serde::Serialize;

/// Fixed status message returned by `GET /`
pub const STATUS_MESSAGE: &str = "Vocal Separator API is running";

#[allow(missing_docs)]
#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: String,
}

#[allow(missing_docs)]
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub message: String,
}

/// GET / - Fixed status payload
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: STATUS_MESSAGE.to_string(),
    })
}

/// GET /api/health - Liveness with version
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        message: "Backend is healthy".to_string(),
    })
}

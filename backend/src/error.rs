//! Error types and error handling for the application
//!
//! This module defines custom error types that can be converted to HTTP responses.
//! All errors implement `IntoResponse` and render as `{"detail": "<message>"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Application-level error types
///
/// Each variant implements automatic conversion to HTTP responses via `IntoResponse`.
#[derive(Error, Debug)]
pub enum AppError {
    /// The multipart request did not carry a usable file
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    /// The request body exceeded the configured limit
    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),

    /// Writing the upload to the staging directory failed
    #[error("Failed to stage upload: {0}")]
    Staging(String),

    /// The separation tool could not be run or reported failure
    #[error(transparent)]
    Execution(#[from] crate::executor::ExecutionError),

    /// The tool exited cleanly but the expected stems are missing
    #[error("Output files not found after processing: {0}")]
    OutputNotFound(String),

    /// No job slot became available
    #[error("{0}")]
    Busy(String),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP status reported for this error
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidUpload(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Busy(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Staging(_)
            | AppError::Execution(_)
            | AppError::OutputNotFound(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();

        if status.is_server_error() {
            error!(status = status.as_u16(), detail = %detail, "Request failed");
        } else {
            warn!(status = status.as_u16(), detail = %detail, "Request rejected");
        }

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

//! Separation API
//!
//! `POST /separate` takes a multipart form with one file field named `file`
//! and answers with the public URLs of the two stems.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::AppError;
use crate::services::separator::Upload;
use crate::state::AppState;

/// Name of the multipart field carrying the audio file
pub const FILE_FIELD: &str = "file";

/// Successful separation response
#[derive(Debug, Serialize)]
pub struct SeparateResponse {
    /// Always "Separation complete"
    pub message: String,
    /// URL of the vocals stem
    pub vocals: String,
    /// URL of the accompaniment stem
    pub accompaniment: String,
    /// Identifier of the job, for log correlation
    pub job_id: String,
}

/// POST /separate - Separate an uploaded track into vocals and accompaniment
pub async fn separate(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SeparateResponse>, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::InvalidUpload(e.body_text()))?;
    let upload = read_upload(&mut multipart).await?;

    info!(
        filename = %upload.filename,
        bytes = upload.data.len(),
        "Received upload"
    );

    let outcome = state.separator.separate(upload).await?;

    Ok(Json(SeparateResponse {
        message: "Separation complete".to_string(),
        vocals: outcome.vocals_url,
        accompaniment: outcome.accompaniment_url,
        job_id: outcome.job_id.to_string(),
    }))
}

/// Pull the first file out of the `file` field, skipping anything else
async fn read_upload(multipart: &mut Multipart) -> Result<Upload, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(field_error)? {
        let field_name = field.name().unwrap_or("").to_string();
        if field_name != FILE_FIELD {
            warn!("Unknown multipart field: {}", field_name);
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::InvalidUpload("`file` field has no filename".to_string()))?;
        let data = field.bytes().await.map_err(field_error)?;

        return Ok(Upload { filename, data });
    }

    Err(AppError::InvalidUpload(format!(
        "missing multipart field `{}`",
        FILE_FIELD
    )))
}

fn field_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::InvalidUpload(err.body_text())
    }
}

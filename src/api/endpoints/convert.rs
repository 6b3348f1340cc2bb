//! `POST /api/convert`: one multipart upload in, one converted document out.

use axum::body::Body;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::Response;

use crate::api::error::ApiError;
use crate::api::types::AppState;
use crate::pipeline::format::header_safe_file_name;
use crate::pipeline::{ConversionError, ConversionResult, Direction};

/// Multipart field carrying the document.
pub const UPLOAD_FIELD: &str = "file";

/// Response header naming the strategy that produced the file.
pub const STRATEGY_HEADER: &str = "x-conversion-strategy";

/// `true` when a fallback produced a lower-fidelity document.
pub const DEGRADED_HEADER: &str = "x-conversion-degraded";

pub async fn convert(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let limit = state.max_upload_bytes();
    let (file_name, data) = read_upload(&mut multipart, limit).await?;

    tracing::info!(file_name = %file_name, size = data.len(), "Upload received");

    let converter = state.converter.clone();
    let result = tokio::task::spawn_blocking(move || converter.convert(&file_name, data))
        .await
        .map_err(|e| ApiError::Internal(format!("conversion task failed: {e}")))??;

    attachment(result)
}

/// First `file` field of the request. The extension is checked before the
/// body of the field is read.
async fn read_upload(multipart: &mut Multipart, limit: usize) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("Uploaded file has no name".into()))?;

        if Direction::from_file_name(&file_name).is_none() {
            return Err(ConversionError::UnsupportedFormat(file_name).into());
        }

        let data = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
        if data.is_empty() {
            return Err(ApiError::BadRequest("Uploaded file is empty".into()));
        }
        if data.len() > limit {
            return Err(too_large(limit));
        }
        return Ok((file_name, data.to_vec()));
    }

    Err(ApiError::BadRequest(format!(
        "No file provided. Send the document in a multipart field named \"{UPLOAD_FIELD}\"."
    )))
}

fn multipart_error(err: MultipartError, limit: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(limit)
    } else {
        ApiError::BadRequest(format!("Malformed upload: {}", err.body_text()))
    }
}

fn too_large(limit: usize) -> ApiError {
    ApiError::PayloadTooLarge {
        limit_mb: limit / (1024 * 1024),
    }
}

fn attachment(result: ConversionResult) -> Result<Response, ApiError> {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        header_safe_file_name(&result.file_name)
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, result.mime_type)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, result.bytes.len())
        .header(header::CACHE_CONTROL, "no-store")
        .header(STRATEGY_HEADER, result.strategy)
        .header(DEGRADED_HEADER, if result.degraded { "true" } else { "false" })
        .body(Body::from(result.bytes))
        .map_err(|e| ApiError::Internal(format!("response build failed: {e}")))
}

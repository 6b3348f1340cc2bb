//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::ConversionError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Upload exceeds {limit_mb} MB")]
    PayloadTooLarge { limit_mb: usize },
    #[error("Conversion failed: {0}")]
    ConversionFailed(String),
    #[error("No writable location: {0}")]
    NoWritableLocation(String),
    #[error("Result unavailable: {0}")]
    ResultUnavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::UnsupportedFormat(detail) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "UNSUPPORTED_FORMAT",
                detail.clone(),
            ),
            ApiError::BadRequest(detail) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                detail.clone(),
            ),
            ApiError::PayloadTooLarge { limit_mb } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                format!("File too large. Maximum {limit_mb} MB."),
            ),
            ApiError::ConversionFailed(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "CONVERSION_FAILED",
                detail.clone(),
            ),
            // Operators need the aggregated diagnostic without server log access
            ApiError::NoWritableLocation(diagnostics) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "NO_WRITABLE_LOCATION",
                diagnostics.clone(),
            ),
            ApiError::ResultUnavailable(detail) => {
                tracing::error!(detail, "Converted file could not be returned");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "RESULT_UNAVAILABLE",
                    detail.clone(),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<ConversionError> for ApiError {
    fn from(err: ConversionError) -> Self {
        match err {
            ConversionError::UnsupportedFormat(_) => ApiError::UnsupportedFormat(err.to_string()),
            ConversionError::NoWritableLocation(_) => ApiError::NoWritableLocation(err.to_string()),
            ConversionError::Exhausted { .. } => ApiError::ConversionFailed(err.to_string()),
            ConversionError::ReadFailure(_) => ApiError::ResultUnavailable(err.to_string()),
            ConversionError::Staging(_) => ApiError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn json_of(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn unsupported_format_returns_415() {
        let response = ApiError::UnsupportedFormat("notes.txt".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let json = json_of(response).await;
        assert_eq!(json["error"]["code"], "UNSUPPORTED_FORMAT");
    }

    #[tokio::test]
    async fn payload_too_large_returns_413() {
        let response = ApiError::PayloadTooLarge { limit_mb: 50 }.into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let json = json_of(response).await;
        assert_eq!(json["error"]["message"], "File too large. Maximum 50 MB.");
    }

    #[tokio::test]
    async fn conversion_failed_returns_422_with_cause() {
        let response = ApiError::ConversionFailed("Conversion failed: tool missing".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = json_of(response).await;
        assert_eq!(json["error"]["code"], "CONVERSION_FAILED");
        assert_eq!(json["error"]["message"], "Conversion failed: tool missing");
    }

    #[tokio::test]
    async fn no_writable_location_exposes_diagnostics() {
        let response = ApiError::NoWritableLocation("user: app, process dir: /srv".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_of(response).await;
        assert_eq!(json["error"]["code"], "NO_WRITABLE_LOCATION");
        assert!(json["error"]["message"].as_str().unwrap().contains("user: app"));
    }

    #[tokio::test]
    async fn internal_returns_500() {
        let response = ApiError::Internal("something broke".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_of(response).await;
        // Internal errors hide details from client
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn read_failure_is_described_to_the_client() {
        let api: ApiError = ConversionError::ReadFailure("converted file is empty".into()).into();
        let response = api.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_of(response).await;
        assert_eq!(json["error"]["code"], "RESULT_UNAVAILABLE");
        assert_eq!(
            json["error"]["message"],
            "Converted file could not be read: converted file is empty"
        );
    }

    #[tokio::test]
    async fn staging_failure_stays_internal() {
        let err = ConversionError::Staging(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "/var/tmp/job-1/a.pdf",
        ));
        let json = json_of(ApiError::from(err).into_response()).await;
        assert_eq!(json["error"]["code"], "INTERNAL");
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn exhausted_chain_maps_to_conversion_failed() {
        let err = ConversionError::Exhausted {
            attempts: vec![],
            last_cause: "Text extraction failed: bad zip".into(),
        };
        let api: ApiError = err.into();
        assert!(matches!(api, ApiError::ConversionFailed(ref m) if m.contains("bad zip")));
    }
}

//! Conversion API router. Routes are nested under `/api/`.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::endpoints::convert::{DEGRADED_HEADER, STRATEGY_HEADER};
use crate::api::types::AppState;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the API router.
///
/// The request body cap follows `ConverterConfig::max_upload_bytes`; the
/// handler enforces the exact file limit.
pub fn api_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes().saturating_add(MULTIPART_OVERHEAD);

    // Browsers only read the download name and strategy when exposed.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .expose_headers([
            header::CONTENT_DISPOSITION,
            HeaderName::from_static(STRATEGY_HEADER),
            HeaderName::from_static(DEGRADED_HEADER),
        ]);

    let api = Router::new()
        .route("/convert", post(endpoints::convert::convert))
        .route("/health", get(endpoints::health::check));

    Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::{ConverterConfig, OfficeConfig};
    use crate::pipeline::extraction::fixtures::pdf_with_lines;
    use crate::pipeline::format::{DOCX_MIME, PDF_MIME};
    use crate::pipeline::layout::LAYOUT_STRATEGY;
    use crate::pipeline::reconstruct::RECONSTRUCT_STRATEGY;
    use crate::pipeline::word_text::fixtures::docx_with_lines;

    const BOUNDARY: &str = "docshift-test-boundary";

    fn test_state(base: &Path) -> AppState {
        AppState::from_config(ConverterConfig {
            temp_base_dir: Some(base.to_path_buf()),
            office: OfficeConfig {
                disabled: true,
                ..Default::default()
            },
            ..Default::default()
        })
    }

    fn upload(field: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/convert")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn response_json(response: axum::http::Response<Body>) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_reports_version_and_office() {
        let tmp = tempfile::tempdir().unwrap();
        let app = api_router(test_state(tmp.path()));
        let req = Request::get("/api/health").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], crate::config::APP_VERSION);
        assert_eq!(json["office_available"], false);
    }

    #[tokio::test]
    async fn pdf_upload_returns_word_attachment() {
        let tmp = tempfile::tempdir().unwrap();
        let app = api_router(test_state(tmp.path()));
        let pdf = pdf_with_lines(&["Introduction", "The quarter closed above plan."]);

        let response = app.oneshot(upload("file", "report.pdf", &pdf)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], DOCX_MIME);
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"report.docx\""
        );
        assert_eq!(headers[header::CACHE_CONTROL], "no-store");
        assert_eq!(headers[STRATEGY_HEADER], RECONSTRUCT_STRATEGY);
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..2], b"PK");
    }

    #[tokio::test]
    async fn word_upload_returns_degraded_pdf_without_office() {
        let tmp = tempfile::tempdir().unwrap();
        let app = api_router(test_state(tmp.path()));
        let docx = docx_with_lines(&["Meeting notes", "Budget approved."]);

        let response = app.oneshot(upload("file", "notes.docx", &docx)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], PDF_MIME);
        assert_eq!(response.headers()[STRATEGY_HEADER], LAYOUT_STRATEGY);
        assert_eq!(response.headers()[DEGRADED_HEADER], "true");

        let length: usize = response.headers()[header::CONTENT_LENGTH]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.len(), length);
        assert!(body.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn unsafe_characters_are_replaced_in_disposition() {
        let tmp = tempfile::tempdir().unwrap();
        let app = api_router(test_state(tmp.path()));
        let pdf = pdf_with_lines(&["Summary"]);

        let response = app.oneshot(upload("file", "q3 report#2.pdf", &pdf)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"q3 report_2.docx\""
        );
    }

    #[tokio::test]
    async fn unsupported_extension_returns_415() {
        let tmp = tempfile::tempdir().unwrap();
        let app = api_router(test_state(tmp.path()));

        let response = app.oneshot(upload("file", "notes.txt", b"hello")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "UNSUPPORTED_FORMAT");
    }

    #[tokio::test]
    async fn missing_file_field_returns_400() {
        let tmp = tempfile::tempdir().unwrap();
        let app = api_router(test_state(tmp.path()));

        let response = app.oneshot(upload("document", "report.pdf", b"%PDF")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert!(json["error"]["message"].as_str().unwrap().contains("\"file\""));
    }

    #[tokio::test]
    async fn empty_upload_returns_400() {
        let tmp = tempfile::tempdir().unwrap();
        let app = api_router(test_state(tmp.path()));

        let response = app.oneshot(upload("file", "report.pdf", b"")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oversized_upload_returns_413() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = test_state(tmp.path()).converter.config().clone();
        config.max_upload_bytes = 1024;
        let app = api_router(AppState::from_config(config));

        let response = app
            .oneshot(upload("file", "big.pdf", &vec![b'x'; 4096]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn legacy_doc_without_office_returns_422() {
        let tmp = tempfile::tempdir().unwrap();
        let app = api_router(test_state(tmp.path()));
        let mut doc = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
        doc.extend_from_slice(&[0u8; 256]);

        let response = app.oneshot(upload("file", "old.doc", &doc)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "CONVERSION_FAILED");
        assert!(json["error"]["message"].as_str().unwrap().contains("LibreOffice"));
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let tmp = tempfile::tempdir().unwrap();
        let app = api_router(test_state(tmp.path()));
        let req = Request::get("/nonexistent").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Whether the office tool can be located right now (primary strategy usable).
    pub office_available: bool,
}

/// `GET /api/health`
pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        office_available: state.converter.office_available(),
    })
}

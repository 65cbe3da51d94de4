//! Analysis status endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// GET /api/analysis/status response
#[derive(Debug, Serialize)]
pub struct AnalysisStatusResponse {
    /// True while a batch job holds the ingestion gate
    pub is_analyzing: bool,
}

/// GET /api/analysis/status
pub async fn analysis_status(State(state): State<AppState>) -> Json<AnalysisStatusResponse> {
    Json(AnalysisStatusResponse {
        is_analyzing: state.busy_gate.is_busy(),
    })
}

/// Build analysis status routes
pub fn analysis_routes() -> Router<AppState> {
    Router::new().route("/api/analysis/status", get(analysis_status))
}

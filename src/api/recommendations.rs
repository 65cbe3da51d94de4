//! Recommendation report endpoint

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::metrics::DateRange;
use crate::error::{ApiError, ApiResult};
use crate::models::RecommendationPayload;
use crate::services::recommendations::{self, RecommendationError};
use crate::AppState;

/// GET /api/recommendations/feedback-report query parameters
#[derive(Debug, Deserialize)]
pub struct ReportParams {
    pub start_date: String,
    pub end_date: String,
}

/// GET /api/recommendations/feedback-report response
#[derive(Debug, Serialize)]
pub struct FeedbackReportResponse {
    /// "ok" when the report is served, "analyzing" while a batch is running
    pub status: &'static str,
    #[serde(flatten)]
    pub report: RecommendationPayload,
}

/// GET /api/recommendations/feedback-report
///
/// While a batch is being analyzed this returns a placeholder without
/// touching the cache or the analysis backend. Otherwise the cached report
/// is served; a stale cache triggers exactly one recompute even under
/// concurrent readers.
pub async fn feedback_report(
    State(state): State<AppState>,
    Query(params): Query<ReportParams>,
) -> ApiResult<Json<FeedbackReportResponse>> {
    let range =
        DateRange::parse(&params.start_date, &params.end_date).map_err(ApiError::BadRequest)?;

    if state.busy_gate.is_busy() {
        return Ok(Json(FeedbackReportResponse {
            status: "analyzing",
            report: RecommendationPayload::default(),
        }));
    }

    let report = state
        .recommendations
        .read_or_fill(&state.db, || async {
            recommendations::compute(&state.db, &state.analysis, &range).await
        })
        .await
        .map_err(|e| match e {
            RecommendationError::Database(err) => ApiError::Database(err),
            RecommendationError::Backend(err) => {
                ApiError::RecommendationsUnavailable(err.to_string())
            }
            RecommendationError::Serialize(err) => ApiError::Internal(err.to_string()),
        })?;

    Ok(Json(FeedbackReportResponse {
        status: "ok",
        report,
    }))
}

/// Build recommendation routes
pub fn recommendation_routes() -> Router<AppState> {
    Router::new().route("/api/recommendations/feedback-report", get(feedback_report))
}

//! Dashboard metrics endpoint

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::metrics::{self, DateRange, DayCount, SentimentCounts, ThemeCount};
use crate::error::{ApiError, ApiResult};
use crate::models::Sentiment;
use crate::AppState;

/// How many negative themes the summary lists
const TOP_THEME_LIMIT: u32 = 5;

/// GET /api/dashboard/summary query parameters
#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    pub start_date: String,
    pub end_date: String,
}

/// Per-sentiment daily review counts
#[derive(Debug, Default, Serialize)]
pub struct DailyCounts {
    pub positive: Vec<DayCount>,
    pub neutral: Vec<DayCount>,
    pub negative: Vec<DayCount>,
}

/// GET /api/dashboard/summary response
#[derive(Debug, Serialize)]
pub struct DashboardSummaryResponse {
    /// True while a batch is being analyzed; all metrics are zeroed then
    pub is_analyzing: bool,
    pub total_reviews: i64,
    pub sentiment_distribution: SentimentCounts,
    pub avg_sentiment_score: f64,
    pub total_themes: i64,
    pub non_positive_themes: i64,
    pub top_negative_themes: Vec<ThemeCount>,
    pub daily_counts: DailyCounts,
}

impl DashboardSummaryResponse {
    /// Placeholder served while a batch job is running
    fn analyzing() -> Self {
        Self {
            is_analyzing: true,
            total_reviews: 0,
            sentiment_distribution: SentimentCounts::default(),
            avg_sentiment_score: 0.0,
            total_themes: 0,
            non_positive_themes: 0,
            top_negative_themes: Vec::new(),
            daily_counts: DailyCounts::default(),
        }
    }
}

/// GET /api/dashboard/summary
///
/// Aggregate metrics over the requested date range. While a batch is being
/// analyzed the counts would be mid-change, so a busy placeholder is served
/// instead of partial numbers.
pub async fn dashboard_summary(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> ApiResult<Json<DashboardSummaryResponse>> {
    let range =
        DateRange::parse(&params.start_date, &params.end_date).map_err(ApiError::BadRequest)?;

    if state.busy_gate.is_busy() {
        return Ok(Json(DashboardSummaryResponse::analyzing()));
    }

    let total_reviews = metrics::total_reviews(&state.db, &range).await?;
    let sentiment_distribution = metrics::sentiment_distribution(&state.db, &range).await?;
    let avg_sentiment_score = metrics::avg_sentiment_score(&state.db, &range).await?;
    let total_themes = metrics::total_theme_mentions(&state.db, &range).await?;
    let non_positive_themes = metrics::non_positive_theme_mentions(&state.db, &range).await?;
    let top_negative_themes =
        metrics::top_themes(&state.db, &range, Sentiment::Negative, TOP_THEME_LIMIT).await?;

    let daily_counts = DailyCounts {
        positive: metrics::daily_counts(&state.db, &range, Sentiment::Positive).await?,
        neutral: metrics::daily_counts(&state.db, &range, Sentiment::Neutral).await?,
        negative: metrics::daily_counts(&state.db, &range, Sentiment::Negative).await?,
    };

    Ok(Json(DashboardSummaryResponse {
        is_analyzing: false,
        total_reviews,
        sentiment_distribution,
        avg_sentiment_score,
        total_themes,
        non_positive_themes,
        top_negative_themes,
        daily_counts,
    }))
}

/// Build dashboard routes
pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/api/dashboard/summary", get(dashboard_summary))
}

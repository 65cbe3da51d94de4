//! Aggregate recommendation computation

use sqlx::SqlitePool;
use thiserror::Error;

use crate::db::metrics::{self, DateRange};
use crate::models::RecommendationPayload;
use crate::services::analysis_client::{AnalysisClient, AnalysisError};

/// How many problem themes feed the recommendation prompt
const PROBLEM_THEME_LIMIT: u32 = 10;

/// Errors from computing a recommendation report
#[derive(Debug, Error)]
pub enum RecommendationError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Analysis backend error: {0}")]
    Backend(#[from] AnalysisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Compute a fresh recommendation report from current aggregate data
///
/// With no reviews in range there is nothing to recommend against; the
/// backend is skipped and an empty report returned.
pub async fn compute(
    pool: &SqlitePool,
    client: &AnalysisClient,
    range: &DateRange,
) -> Result<RecommendationPayload, RecommendationError> {
    let total = metrics::total_reviews(pool, range).await?;
    if total == 0 {
        tracing::debug!("no reviews in range, returning empty recommendation report");
        return Ok(RecommendationPayload::default());
    }

    let problem_themes =
        metrics::non_positive_theme_counts(pool, range, PROBLEM_THEME_LIMIT).await?;

    let payload = client
        .generate_recommendations(total, &problem_themes)
        .await?;

    tracing::info!(
        insights = payload.feedback_analysis.len(),
        proposals = payload.overall_proposals.len(),
        "recommendation report computed"
    );

    Ok(payload)
}

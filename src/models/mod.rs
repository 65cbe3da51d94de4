//! Data models for revlens

mod batch;
mod recommendation;
mod review;
pub mod themes;

pub use batch::{BatchSummary, ImportBatch, SourceKind};
pub use recommendation::{FeedbackInsight, Priority, RecommendationPayload};
pub use review::{NewReview, ReviewAnalysis, Sentiment, ThemeAssessment};

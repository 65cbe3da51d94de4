//! Review records and per-review analysis results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sentiment label assigned by the analysis backend
///
/// The closed label set is shared by reviews, theme assessments, and the
/// database CHECK constraints. Anything outside it is rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// All valid labels, in display order
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative];

    /// Canonical lowercase label as stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }

    /// Parse a label, tolerating surrounding whitespace and case
    ///
    /// Returns None for anything outside the closed label set.
    pub fn parse(label: &str) -> Option<Sentiment> {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Sentiment::Positive),
            "neutral" => Some(Sentiment::Neutral),
            "negative" => Some(Sentiment::Negative),
            _ => None,
        }
    }
}

/// A review row ready for insertion
///
/// Reviews are only persisted after their analysis succeeds, so the sentiment
/// is always present here even though the column allows NULL for older data.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub raw_text: String,
    pub language_code: Option<String>,
    pub overall_sentiment: Sentiment,
    pub created_at: DateTime<Utc>,
}

impl NewReview {
    /// Create a review record for an analyzed row
    pub fn new(
        batch_id: Uuid,
        raw_text: String,
        language_code: Option<String>,
        overall_sentiment: Sentiment,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            batch_id,
            raw_text,
            language_code,
            overall_sentiment,
            created_at: Utc::now(),
        }
    }
}

/// One theme the backend identified in a review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeAssessment {
    /// Canonical vocabulary label
    pub theme: String,
    /// Sentiment toward this theme
    pub sentiment: Sentiment,
}

/// Validated analysis result for a single review
#[derive(Debug, Clone)]
pub struct ReviewAnalysis {
    pub overall_sentiment: Sentiment,
    /// Deduplicated themes, restricted to the canonical vocabulary
    pub themes: Vec<ThemeAssessment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_parse_accepts_known_labels() {
        assert_eq!(Sentiment::parse("positive"), Some(Sentiment::Positive));
        assert_eq!(Sentiment::parse("  Neutral "), Some(Sentiment::Neutral));
        assert_eq!(Sentiment::parse("NEGATIVE"), Some(Sentiment::Negative));
    }

    #[test]
    fn sentiment_parse_rejects_unknown_labels() {
        assert_eq!(Sentiment::parse("mixed"), None);
        assert_eq!(Sentiment::parse(""), None);
        assert_eq!(Sentiment::parse("positively"), None);
    }

    #[test]
    fn sentiment_serializes_lowercase() {
        let json = serde_json::to_string(&Sentiment::Positive).unwrap();
        assert_eq!(json, "\"positive\"");

        let parsed: Sentiment = serde_json::from_str("\"negative\"").unwrap();
        assert_eq!(parsed, Sentiment::Negative);
    }

    #[test]
    fn new_review_assigns_id_and_timestamp() {
        let batch_id = Uuid::new_v4();
        let review = NewReview::new(batch_id, "Great service".to_string(), None, Sentiment::Positive);

        assert_eq!(review.batch_id, batch_id);
        assert_ne!(review.id, batch_id);
        assert_eq!(review.overall_sentiment, Sentiment::Positive);
    }
}

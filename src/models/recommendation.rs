//! Aggregate recommendation payload served to the dashboard

use serde::{Deserialize, Serialize};

/// Priority the backend assigned to an insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[serde(alias = "High")]
    High,
    #[serde(alias = "Medium")]
    Medium,
    #[serde(alias = "Low")]
    Low,
}

/// One actionable insight derived from recurring feedback
///
/// Field names match the dashboard contract exactly; the payload is stored
/// serialized and replayed verbatim, so the wire shape is fixed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackInsight {
    pub priority: Priority,
    /// Short statement of the recurring problem
    pub problem: String,
    /// Concrete improvement proposal
    #[serde(rename = "proposalText")]
    pub proposal_text: String,
}

/// Full recommendation report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationPayload {
    /// Per-problem insights, highest priority first
    pub feedback_analysis: Vec<FeedbackInsight>,
    /// Cross-cutting proposals not tied to a single problem
    #[serde(rename = "overallProposals")]
    pub overall_proposals: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_round_trips_with_renamed_keys() {
        let payload = RecommendationPayload {
            feedback_analysis: vec![FeedbackInsight {
                priority: Priority::High,
                problem: "Orders arrive late".to_string(),
                proposal_text: "Add a second regional courier".to_string(),
            }],
            overall_proposals: vec!["Publish delivery time estimates".to_string()],
        };

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"proposalText\""));
        assert!(json.contains("\"overallProposals\""));
        assert!(json.contains("\"priority\":\"high\""));

        let back: RecommendationPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn priority_accepts_capitalized_aliases() {
        let insight: FeedbackInsight = serde_json::from_str(
            r#"{"priority":"High","problem":"p","proposalText":"t"}"#,
        )
        .unwrap();
        assert_eq!(insight.priority, Priority::High);
    }

    #[test]
    fn default_payload_is_empty() {
        let payload = RecommendationPayload::default();
        assert!(payload.feedback_analysis.is_empty());
        assert!(payload.overall_proposals.is_empty());
    }
}

//! Analysis backend client
//!
//! Talks to an Ollama-compatible server over its `/api/generate` endpoint.
//! Responses arrive as an envelope whose `response` field is itself a JSON
//! document; this module owns both the envelope handling and the validation
//! of the inner payloads against the sentiment labels and theme vocabulary.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::metrics::ThemeCount;
use crate::models::themes;
use crate::models::{RecommendationPayload, ReviewAnalysis, Sentiment, ThemeAssessment};

pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
pub const DEFAULT_MODEL: &str = "llama3.1";

const USER_AGENT: &str = "revlens/0.1.0";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY_MS: u64 = 250;

/// Analysis backend errors
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Backend error {0}: {1}")]
    BackendError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl AnalysisError {
    /// Transport failures and backend 5xx responses are worth retrying;
    /// malformed payloads and 4xx responses are not.
    fn is_retryable(&self) -> bool {
        match self {
            AnalysisError::NetworkError(_) => true,
            AnalysisError::BackendError(status, _) => (500..600).contains(status),
            AnalysisError::ParseError(_) => false,
        }
    }
}

/// Request body for POST /api/generate
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    format: &'a str,
    stream: bool,
}

/// Response envelope from /api/generate (non-streaming)
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct ReviewEnvelope {
    review_analysis: ReviewAnalysisWire,
}

#[derive(Debug, Deserialize)]
struct ReviewAnalysisWire {
    overall_sentiment: String,
    #[serde(default)]
    key_themes: Vec<KeyThemeWire>,
}

#[derive(Debug, Deserialize)]
struct KeyThemeWire {
    theme: String,
    sentiment: String,
}

const RECOMMENDATION_SYSTEM: &str = "\
You are a customer experience consultant for an online retailer. From the \
aggregate review statistics given by the user, propose concrete service \
improvements. Respond with JSON only, in exactly this shape:\n\
{\"feedback_analysis\": [{\"priority\": \"high|medium|low\", \"problem\": \
\"short problem statement\", \"proposalText\": \"concrete proposal\"}], \
\"overallProposals\": [\"cross-cutting proposal\"]}\n\
Order feedback_analysis by priority, highest first.";

fn build_review_system() -> String {
    format!(
        "You are a customer review analyst for an online retailer. Analyze \
         the review given by the user and respond with JSON only, in exactly \
         this shape:\n\
         {{\"review_analysis\": {{\"overall_sentiment\": \"label\", \
         \"key_themes\": [{{\"theme\": \"label\", \"sentiment\": \"label\"}}]}}}}\n\
         Sentiment labels must be one of: positive, neutral, negative.\n\
         Theme labels must come from this list: {}.\n\
         Only include themes the review actually mentions.",
        themes::THEME_VOCABULARY.join(", ")
    )
}

fn build_recommendation_prompt(total_reviews: i64, problem_themes: &[ThemeCount]) -> String {
    let mut prompt = format!("Reviews analyzed: {total_reviews}\n");
    if problem_themes.is_empty() {
        prompt.push_str("No recurring problem themes in this period.\n");
    } else {
        prompt.push_str("Most frequent problem themes (neutral or negative mentions):\n");
        for entry in problem_themes {
            prompt.push_str(&format!("- {}: {}\n", entry.theme, entry.count));
        }
    }
    prompt
}

/// Validate the inner review payload
///
/// Unknown sentiment labels fail the whole row. Theme labels outside the
/// vocabulary are dropped with a warning, and duplicate labels keep their
/// first assessment.
fn parse_review_analysis(inner: &str) -> Result<ReviewAnalysis, AnalysisError> {
    let envelope: ReviewEnvelope = serde_json::from_str(inner)
        .map_err(|e| AnalysisError::ParseError(format!("review payload: {e}")))?;

    let wire = envelope.review_analysis;
    let overall_sentiment = Sentiment::parse(&wire.overall_sentiment).ok_or_else(|| {
        AnalysisError::ParseError(format!(
            "unknown sentiment label '{}'",
            wire.overall_sentiment
        ))
    })?;

    let mut parsed: Vec<ThemeAssessment> = Vec::new();
    for entry in wire.key_themes {
        let sentiment = Sentiment::parse(&entry.sentiment).ok_or_else(|| {
            AnalysisError::ParseError(format!(
                "unknown sentiment label '{}' for theme '{}'",
                entry.sentiment, entry.theme
            ))
        })?;

        let Some(canonical) = themes::canonical_theme(&entry.theme) else {
            tracing::warn!(theme = %entry.theme, "dropping theme outside the vocabulary");
            continue;
        };

        // First assessment wins
        if parsed.iter().any(|t| t.theme == canonical) {
            continue;
        }

        parsed.push(ThemeAssessment {
            theme: canonical.to_string(),
            sentiment,
        });
    }

    Ok(ReviewAnalysis {
        overall_sentiment,
        themes: parsed,
    })
}

fn parse_recommendations(inner: &str) -> Result<RecommendationPayload, AnalysisError> {
    serde_json::from_str(inner)
        .map_err(|e| AnalysisError::ParseError(format!("recommendation payload: {e}")))
}

/// Client for the analysis backend
pub struct AnalysisClient {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
    review_system: String,
}

impl AnalysisClient {
    pub fn new(base_url: &str, model: &str) -> Result<Self, AnalysisError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AnalysisError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            review_system: build_review_system(),
        })
    }

    /// Analyze a single review text
    pub async fn analyze_review(&self, text: &str) -> Result<ReviewAnalysis, AnalysisError> {
        let inner = self.generate(&self.review_system, text).await?;
        parse_review_analysis(&inner)
    }

    /// Produce the aggregate recommendation report
    pub async fn generate_recommendations(
        &self,
        total_reviews: i64,
        problem_themes: &[ThemeCount],
    ) -> Result<RecommendationPayload, AnalysisError> {
        let prompt = build_recommendation_prompt(total_reviews, problem_themes);
        let inner = self.generate(RECOMMENDATION_SYSTEM, &prompt).await?;
        parse_recommendations(&inner)
    }

    /// POST /api/generate with bounded retry on transient failures
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, AnalysisError> {
        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);
        let mut attempt = 1;

        loop {
            match self.generate_once(system, prompt).await {
                Ok(inner) => return Ok(inner),
                Err(e) if attempt < MAX_ATTEMPTS && e.is_retryable() => {
                    tracing::warn!(attempt, error = %e, "analysis request failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn generate_once(&self, system: &str, prompt: &str) -> Result<String, AnalysisError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            system,
            format: "json",
            stream: false,
        };

        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalysisError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AnalysisError::BackendError(status.as_u16(), error_text));
        }

        let envelope: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ParseError(e.to_string()))?;

        Ok(envelope.response)
    }
}

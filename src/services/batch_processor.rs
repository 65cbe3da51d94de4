//! Background batch processing
//!
//! Re-parses the accepted upload with the same rules the submit handler used
//! for counting, then analyzes and persists rows one at a time, in upload
//! order. Failures are contained per row: a bad row is skipped and the rest
//! of the batch keeps going.

use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::db::reviews;
use crate::events::{EventBus, ReviewEvent};
use crate::models::NewReview;
use crate::services::analysis_client::AnalysisClient;
use crate::services::batch_parser;
use crate::services::busy_gate::BusyGuard;

/// One accepted batch waiting for processing
#[derive(Debug)]
pub struct BatchJob {
    pub batch_id: Uuid,
    /// Decoded upload text; rows are re-extracted from it
    pub text: String,
    pub delimiter: u8,
    /// Language hint applied to every row
    pub language: Option<String>,
    /// Gate guard held for the life of the job; dropping it reopens ingestion
    pub guard: BusyGuard,
}

/// Runs batch jobs against the analysis backend and the database
#[derive(Clone)]
pub struct BatchProcessor {
    db: SqlitePool,
    analysis: Arc<AnalysisClient>,
    event_bus: EventBus,
}

impl BatchProcessor {
    pub fn new(db: SqlitePool, analysis: Arc<AnalysisClient>, event_bus: EventBus) -> Self {
        Self {
            db,
            analysis,
            event_bus,
        }
    }

    /// Process one batch to completion
    ///
    /// Never returns an error: every failure is logged, counted, and
    /// contained to its row. The job's gate guard drops when this returns,
    /// whatever the outcome.
    pub async fn run(&self, job: BatchJob, cancel: &CancellationToken) {
        let BatchJob {
            batch_id,
            text,
            delimiter,
            language,
            guard: _guard,
        } = job;

        let rows = batch_parser::extract_rows(&text, delimiter);
        tracing::info!(batch_id = %batch_id, rows = rows.len(), "batch processing started");

        self.event_bus.emit_lossy(ReviewEvent::AnalysisStarted {
            batch_id,
            total_rows: rows.len(),
            timestamp: Utc::now(),
        });

        let mut analyzed = 0usize;
        let mut skipped = 0usize;

        for (row, row_text) in rows.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::warn!(
                    batch_id = %batch_id,
                    row,
                    "shutdown requested, abandoning remaining rows"
                );
                self.event_bus.emit_lossy(ReviewEvent::AnalysisCancelled {
                    batch_id,
                    analyzed,
                    skipped,
                    timestamp: Utc::now(),
                });
                return;
            }

            match self.analysis.analyze_review(row_text).await {
                Ok(analysis) => {
                    let review = NewReview::new(
                        batch_id,
                        row_text.clone(),
                        language.clone(),
                        analysis.overall_sentiment,
                    );
                    let review_id = review.id;

                    match reviews::insert_review_with_themes(&self.db, &review, &analysis.themes)
                        .await
                    {
                        Ok(stats) => {
                            if stats.duplicates_ignored > 0 {
                                tracing::debug!(
                                    batch_id = %batch_id,
                                    row,
                                    duplicates = stats.duplicates_ignored,
                                    "duplicate theme labels ignored"
                                );
                            }
                            analyzed += 1;
                            self.event_bus.emit_lossy(ReviewEvent::ReviewAnalyzed {
                                batch_id,
                                review_id,
                                row,
                                sentiment: analysis.overall_sentiment.as_str().to_string(),
                                timestamp: Utc::now(),
                            });
                        }
                        Err(e) => {
                            tracing::error!(
                                batch_id = %batch_id,
                                row,
                                error = %e,
                                "failed to persist analyzed review, skipping row"
                            );
                            skipped += 1;
                            self.event_bus.emit_lossy(ReviewEvent::RowSkipped {
                                batch_id,
                                row,
                                reason: "persistence failed".to_string(),
                                timestamp: Utc::now(),
                            });
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        batch_id = %batch_id,
                        row,
                        error = %e,
                        "review analysis failed, skipping row"
                    );
                    skipped += 1;
                    self.event_bus.emit_lossy(ReviewEvent::RowSkipped {
                        batch_id,
                        row,
                        reason: e.to_string(),
                        timestamp: Utc::now(),
                    });
                }
            }
        }

        tracing::info!(batch_id = %batch_id, analyzed, skipped, "batch processing finished");
        self.event_bus.emit_lossy(ReviewEvent::AnalysisCompleted {
            batch_id,
            analyzed,
            skipped,
            timestamp: Utc::now(),
        });
    }
}

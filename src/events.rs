//! Event types for the review ingestion pipeline
//!
//! Events are broadcast via [`EventBus`] and serialized for SSE transmission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Pipeline event types
///
/// Every stage of batch processing emits one of these so connected UIs can
/// follow ingestion progress without polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReviewEvent {
    /// Background analysis of an imported batch started
    AnalysisStarted {
        /// Batch being processed
        batch_id: Uuid,
        /// Number of review rows the batch parser produced
        total_rows: usize,
        /// When processing started
        timestamp: DateTime<Utc>,
    },

    /// A single review row was analyzed and persisted
    ReviewAnalyzed {
        /// Batch being processed
        batch_id: Uuid,
        /// Persisted review UUID
        review_id: Uuid,
        /// Zero-based row index within the batch
        row: usize,
        /// Overall sentiment label assigned by the analysis backend
        sentiment: String,
        /// When the row was persisted
        timestamp: DateTime<Utc>,
    },

    /// A single review row was skipped
    ///
    /// Emitted when analysis fails after retries, when the backend returns a
    /// malformed payload, or when persistence of the row fails. The rest of
    /// the batch continues.
    RowSkipped {
        /// Batch being processed
        batch_id: Uuid,
        /// Zero-based row index within the batch
        row: usize,
        /// Short human-readable reason
        reason: String,
        /// When the row was skipped
        timestamp: DateTime<Utc>,
    },

    /// All rows of a batch were attempted
    AnalysisCompleted {
        /// Batch that finished
        batch_id: Uuid,
        /// Rows analyzed and persisted
        analyzed: usize,
        /// Rows skipped
        skipped: usize,
        /// When processing finished
        timestamp: DateTime<Utc>,
    },

    /// Batch processing stopped early due to shutdown
    AnalysisCancelled {
        /// Batch that was interrupted
        batch_id: Uuid,
        /// Rows analyzed before cancellation
        analyzed: usize,
        /// Rows skipped before cancellation
        skipped: usize,
        /// When processing stopped
        timestamp: DateTime<Utc>,
    },
}

impl ReviewEvent {
    /// Get the event type name as a string (used as the SSE event name)
    pub fn event_type(&self) -> &str {
        match self {
            ReviewEvent::AnalysisStarted { .. } => "AnalysisStarted",
            ReviewEvent::ReviewAnalyzed { .. } => "ReviewAnalyzed",
            ReviewEvent::RowSkipped { .. } => "RowSkipped",
            ReviewEvent::AnalysisCompleted { .. } => "AnalysisCompleted",
            ReviewEvent::AnalysisCancelled { .. } => "AnalysisCancelled",
        }
    }
}

/// Event bus for broadcasting pipeline events
///
/// Uses tokio broadcast channels. Slow subscribers miss events rather than
/// applying backpressure to the pipeline.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ReviewEvent>,
}

impl EventBus {
    /// Creates a new EventBus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<ReviewEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Pipeline progress events are advisory; processing never depends on a
    /// listener being connected.
    pub fn emit_lossy(&self, event: ReviewEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

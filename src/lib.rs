//! revlens library interface
//!
//! Exposes the application state, router, and service internals for the
//! binary and the integration tests.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;

use crate::events::EventBus;
use crate::services::analysis_client::AnalysisClient;
use crate::services::batch_processor::BatchProcessor;
use crate::services::busy_gate::BusyGate;
use crate::services::job_runner::{JobRunner, JobSender};
use crate::services::recommendation_cache::RecommendationCache;

/// Review uploads are full exports at times; allow a generous body size
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Event bus capacity; slow SSE clients miss events past this backlog
const EVENT_BUS_CAPACITY: usize = 256;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Single-job ingestion gate
    pub busy_gate: BusyGate,
    /// Cached recommendation report
    pub recommendations: RecommendationCache,
    /// Analysis backend client
    pub analysis: Arc<AnalysisClient>,
    /// Submit side of the batch job queue
    pub jobs: JobSender,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Wire up the full pipeline around an open database and backend client
    ///
    /// Returns the shared state plus the worker handle and shutdown token the
    /// caller owns; cancel the token, then join the runner, to drain cleanly.
    pub fn assemble(
        db: SqlitePool,
        analysis: Arc<AnalysisClient>,
    ) -> (AppState, JobRunner, CancellationToken) {
        let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
        let busy_gate = BusyGate::new();
        let cancel = CancellationToken::new();

        let processor = BatchProcessor::new(db.clone(), Arc::clone(&analysis), event_bus.clone());
        let (runner, jobs) = JobRunner::start(processor, cancel.clone());

        let state = AppState {
            db,
            event_bus,
            busy_gate,
            recommendations: RecommendationCache::new(),
            analysis,
            jobs,
            startup_time: Utc::now(),
        };

        (state, runner, cancel)
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::import_routes())
        .merge(api::analysis_routes())
        .merge(api::recommendation_routes())
        .merge(api::dashboard_routes())
        .merge(api::health_routes())
        .route("/api/events", get(api::event_stream))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

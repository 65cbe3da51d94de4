//! Single-slot recommendation cache
//!
//! One report is cached at a time, persisted in the analysis_state slot so
//! it survives restarts. Readers go through [`RecommendationCache::read_or_fill`];
//! the internal lock makes concurrent cold reads single-flight, so exactly
//! one of them computes while the rest wait and reuse the stored result.
//!
//! Invalidation deliberately does not take the lock (a submit must not wait
//! behind an in-flight recompute). It advances the slot epoch instead, which
//! makes a racing fill store nothing while still returning its result to the
//! caller that requested it.

use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::db::analysis_state;
use crate::models::RecommendationPayload;
use crate::services::recommendations::RecommendationError;

/// Shared handle to the cache
#[derive(Debug, Clone, Default)]
pub struct RecommendationCache {
    refill_lock: Arc<Mutex<()>>,
}

impl RecommendationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached report, computing and storing it when stale
    pub async fn read_or_fill<F, Fut>(
        &self,
        pool: &SqlitePool,
        compute: F,
    ) -> Result<RecommendationPayload, RecommendationError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<RecommendationPayload, RecommendationError>>,
    {
        let _guard = self.refill_lock.lock().await;

        let slot = analysis_state::read_slot(pool).await?;
        if slot.is_analyzed {
            if let Some(text) = slot.result_text.as_deref() {
                match serde_json::from_str(text) {
                    Ok(payload) => return Ok(payload),
                    Err(e) => {
                        tracing::warn!("stored recommendation report unreadable, recomputing: {e}");
                    }
                }
            }
        }

        let payload = compute().await?;
        let serialized = serde_json::to_string(&payload)?;

        if analysis_state::fill_slot_if_current(pool, slot.epoch, &serialized).await? {
            tracing::debug!("recommendation report cached");
        } else {
            tracing::debug!("slot invalidated during recompute, result not cached");
        }

        Ok(payload)
    }

    /// Drop the cached report; the next read recomputes
    pub async fn invalidate(&self, pool: &SqlitePool) -> sqlx::Result<()> {
        analysis_state::clear_slot(pool).await
    }
}

//! Persistence for the cached recommendation report
//!
//! The table holds one logical row (id = 1). `is_analyzed` marks the stored
//! report as current. Every invalidation bumps `epoch`, which lets a fill
//! that raced with an invalidation detect that its result is already stale.

use sqlx::{Row, SqlitePool};

/// Contents of the singleton cache slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSlot {
    pub is_analyzed: bool,
    pub result_text: Option<String>,
    pub epoch: i64,
}

/// Read the slot, creating the default row on first access
pub async fn read_slot(pool: &SqlitePool) -> sqlx::Result<CacheSlot> {
    sqlx::query(
        "INSERT OR IGNORE INTO analysis_state (id, is_analyzed, result_text, epoch) \
         VALUES (1, 0, NULL, 0)",
    )
    .execute(pool)
    .await?;

    let row =
        sqlx::query("SELECT is_analyzed, result_text, epoch FROM analysis_state WHERE id = 1")
            .fetch_one(pool)
            .await?;

    Ok(CacheSlot {
        is_analyzed: row.get::<i64, _>("is_analyzed") != 0,
        result_text: row.get("result_text"),
        epoch: row.get("epoch"),
    })
}

/// Mark the slot stale and advance the epoch
pub async fn clear_slot(pool: &SqlitePool) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO analysis_state (id, is_analyzed, result_text, epoch)
        VALUES (1, 0, NULL, 1)
        ON CONFLICT(id) DO UPDATE SET
            is_analyzed = 0,
            result_text = NULL,
            epoch = analysis_state.epoch + 1
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Store a freshly computed report unless the slot was invalidated after
/// `observed_epoch` was read
///
/// Returns true when the report was stored, false when an invalidation won
/// the race and the slot stays stale.
pub async fn fill_slot_if_current(
    pool: &SqlitePool,
    observed_epoch: i64,
    result_text: &str,
) -> sqlx::Result<bool> {
    let result = sqlx::query(
        "UPDATE analysis_state SET is_analyzed = 1, result_text = ? WHERE id = 1 AND epoch = ?",
    )
    .bind(result_text)
    .bind(observed_epoch)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    #[tokio::test]
    async fn fresh_slot_reads_as_stale() {
        let pool = connect_in_memory().await.unwrap();

        let slot = read_slot(&pool).await.unwrap();
        assert!(!slot.is_analyzed);
        assert_eq!(slot.result_text, None);
        assert_eq!(slot.epoch, 0);
    }

    #[tokio::test]
    async fn fill_then_clear_round_trip() {
        let pool = connect_in_memory().await.unwrap();

        let slot = read_slot(&pool).await.unwrap();
        assert!(fill_slot_if_current(&pool, slot.epoch, "{\"report\":1}")
            .await
            .unwrap());

        let filled = read_slot(&pool).await.unwrap();
        assert!(filled.is_analyzed);
        assert_eq!(filled.result_text.as_deref(), Some("{\"report\":1}"));

        clear_slot(&pool).await.unwrap();
        let cleared = read_slot(&pool).await.unwrap();
        assert!(!cleared.is_analyzed);
        assert_eq!(cleared.result_text, None);
        assert_eq!(cleared.epoch, filled.epoch + 1);
    }

    #[tokio::test]
    async fn stale_fill_is_rejected_after_invalidation() {
        let pool = connect_in_memory().await.unwrap();

        let slot = read_slot(&pool).await.unwrap();

        // Invalidation arrives while the report is still being computed
        clear_slot(&pool).await.unwrap();

        let stored = fill_slot_if_current(&pool, slot.epoch, "{\"report\":\"stale\"}")
            .await
            .unwrap();
        assert!(!stored);

        let after = read_slot(&pool).await.unwrap();
        assert!(!after.is_analyzed, "slot must stay stale");
        assert_eq!(after.result_text, None);
    }
}

//! Import batch database operations

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{BatchSummary, ImportBatch, SourceKind};

/// Insert a newly accepted batch
pub async fn insert_batch(pool: &SqlitePool, batch: &ImportBatch) -> sqlx::Result<()> {
    let meta_info = batch.meta_info.as_ref().map(|v| v.to_string());

    sqlx::query(
        r#"
        INSERT INTO import_batches (id, source_type, source_name, meta_info, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(batch.id.to_string())
    .bind(batch.source_type.as_str())
    .bind(&batch.source_name)
    .bind(meta_info)
    .bind(batch.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// List the most recent batches, newest first, with persisted review counts
pub async fn list_recent_batches(pool: &SqlitePool, limit: u32) -> sqlx::Result<Vec<BatchSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT b.id, b.source_type, b.source_name, b.created_at,
               COUNT(r.id) AS review_count
        FROM import_batches b
        LEFT JOIN reviews r ON r.batch_id = b.id
        GROUP BY b.id
        ORDER BY b.created_at DESC, b.id DESC
        LIMIT ?
        "#,
    )
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    let mut batches = Vec::with_capacity(rows.len());
    for row in rows {
        let id: String = row.get("id");
        let id = Uuid::parse_str(&id)
            .map_err(|e| sqlx::Error::Decode(format!("invalid batch id: {e}").into()))?;

        let source_type: String = row.get("source_type");
        let source_type = SourceKind::parse(&source_type)
            .ok_or_else(|| sqlx::Error::Decode(format!("unknown source type: {source_type}").into()))?;

        let created_at: String = row.get("created_at");
        let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| sqlx::Error::Decode(format!("invalid created_at: {e}").into()))?
            .with_timezone(&Utc);

        batches.push(BatchSummary {
            id,
            source_type,
            source_name: row.get("source_name"),
            created_at,
            review_count: row.get("review_count"),
        });
    }

    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;
    use serde_json::json;

    #[tokio::test]
    async fn insert_preserves_metadata_verbatim() {
        let pool = connect_in_memory().await.unwrap();

        let meta = json!({"original_filename": "q3.csv", "rows_hint": 250});
        let batch = ImportBatch::new(
            SourceKind::Csv,
            Some("q3.csv".to_string()),
            Some(meta.clone()),
        );
        insert_batch(&pool, &batch).await.unwrap();

        let stored: String = sqlx::query_scalar("SELECT meta_info FROM import_batches WHERE id = ?")
            .bind(batch.id.to_string())
            .fetch_one(&pool)
            .await
            .unwrap();
        let stored: serde_json::Value = serde_json::from_str(&stored).unwrap();
        assert_eq!(stored, meta);
    }

    #[tokio::test]
    async fn listing_orders_newest_first_and_respects_limit() {
        let pool = connect_in_memory().await.unwrap();

        let mut ids = Vec::new();
        for i in 0..5i64 {
            let mut batch = ImportBatch::new(SourceKind::Csv, Some(format!("batch-{i}.csv")), None);
            // Spread timestamps so the ordering is deterministic
            batch.created_at = Utc::now() - chrono::Duration::minutes(5 - i);
            insert_batch(&pool, &batch).await.unwrap();
            ids.push(batch.id);
        }

        let listed = list_recent_batches(&pool, 3).await.unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].id, ids[4]);
        assert_eq!(listed[1].id, ids[3]);
        assert_eq!(listed[2].id, ids[2]);
    }

    #[tokio::test]
    async fn listing_counts_reviews_per_batch() {
        let pool = connect_in_memory().await.unwrap();

        let batch = ImportBatch::new(SourceKind::Csv, None, None);
        insert_batch(&pool, &batch).await.unwrap();

        for text in ["Great product", "Late delivery"] {
            let review = crate::models::NewReview::new(
                batch.id,
                text.to_string(),
                None,
                crate::models::Sentiment::Neutral,
            );
            crate::db::reviews::insert_review_with_themes(&pool, &review, &[])
                .await
                .unwrap();
        }

        let listed = list_recent_batches(&pool, 10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].review_count, 2);
    }
}

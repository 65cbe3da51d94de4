//! Database access for revlens
//!
//! All persistent state lives in a single SQLite database: import batches,
//! analyzed reviews with their themes, and the cached recommendation slot.

pub mod analysis_state;
pub mod batches;
pub mod metrics;
pub mod reviews;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

/// Initialize the on-disk database connection pool
///
/// Creates the database file (and parent directories) if missing, then
/// applies the schema. Foreign keys are enabled on every pooled connection
/// because the cascade deletes depend on them.
pub async fn connect(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    tracing::debug!("Connecting to database: {}", db_path.display());

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory pool, used by the test suites
///
/// A shared pool against ":memory:" would hand each connection its own empty
/// database, so the pool is capped at one connection.
pub async fn connect_in_memory() -> sqlx::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes if they don't exist
pub async fn init_schema(pool: &SqlitePool) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS import_batches (
            id TEXT PRIMARY KEY,
            source_type TEXT NOT NULL CHECK (source_type IN ('csv', 'excel', 'api')),
            source_name TEXT,
            meta_info TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reviews (
            id TEXT PRIMARY KEY,
            batch_id TEXT NOT NULL REFERENCES import_batches(id) ON DELETE CASCADE,
            raw_text TEXT NOT NULL,
            language_code TEXT,
            overall_sentiment TEXT CHECK (overall_sentiment IN ('positive', 'neutral', 'negative')),
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reviews_batch_id ON reviews(batch_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reviews_created_at ON reviews(created_at)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reviews_sentiment ON reviews(overall_sentiment)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS review_themes (
            id TEXT PRIMARY KEY,
            review_id TEXT NOT NULL REFERENCES reviews(id) ON DELETE CASCADE,
            theme TEXT NOT NULL,
            sentiment TEXT NOT NULL CHECK (sentiment IN ('positive', 'neutral', 'negative')),
            UNIQUE (review_id, theme)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_review_themes_theme ON review_themes(theme)")
        .execute(pool)
        .await?;

    // Singleton slot for the cached recommendation report. The epoch column
    // lets a fill detect that an invalidation happened while it was computing.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analysis_state (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            is_analyzed INTEGER NOT NULL DEFAULT 0,
            result_text TEXT,
            epoch INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!(
        "Database schema initialized (import_batches, reviews, review_themes, analysis_state)"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ImportBatch, NewReview, Sentiment, SourceKind, ThemeAssessment};

    #[tokio::test]
    async fn schema_is_idempotent() {
        let pool = connect_in_memory().await.unwrap();
        // Second pass must not fail on existing tables
        init_schema(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn deleting_a_batch_cascades_to_reviews_and_themes() {
        let pool = connect_in_memory().await.unwrap();

        let batch = ImportBatch::new(SourceKind::Csv, None, None);
        batches::insert_batch(&pool, &batch).await.unwrap();

        let review = NewReview::new(
            batch.id,
            "Fast delivery, sloppy packaging".to_string(),
            None,
            Sentiment::Neutral,
        );
        let themes = vec![
            ThemeAssessment {
                theme: "delivery speed".to_string(),
                sentiment: Sentiment::Positive,
            },
            ThemeAssessment {
                theme: "packaging".to_string(),
                sentiment: Sentiment::Negative,
            },
        ];
        reviews::insert_review_with_themes(&pool, &review, &themes)
            .await
            .unwrap();

        sqlx::query("DELETE FROM import_batches WHERE id = ?")
            .bind(batch.id.to_string())
            .execute(&pool)
            .await
            .unwrap();

        let review_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews")
            .fetch_one(&pool)
            .await
            .unwrap();
        let theme_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM review_themes")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(review_count, 0);
        assert_eq!(theme_count, 0);
    }

    #[tokio::test]
    async fn sentiment_check_constraint_rejects_unknown_labels() {
        let pool = connect_in_memory().await.unwrap();

        let batch = ImportBatch::new(SourceKind::Csv, None, None);
        batches::insert_batch(&pool, &batch).await.unwrap();

        let result = sqlx::query(
            "INSERT INTO reviews (id, batch_id, raw_text, overall_sentiment, created_at) \
             VALUES (?, ?, 'text', 'ecstatic', ?)",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(batch.id.to_string())
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&pool)
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn on_disk_database_survives_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("revlens.db");

        {
            let pool = connect(&path).await.unwrap();
            let batch = ImportBatch::new(SourceKind::Api, Some("partner feed".to_string()), None);
            batches::insert_batch(&pool, &batch).await.unwrap();
            pool.close().await;
        }

        let pool = connect(&path).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM import_batches")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}

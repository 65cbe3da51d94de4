//! Review persistence
//!
//! A review and its themes are committed in one transaction so a crash can
//! never leave a review visible with half its themes missing.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{NewReview, ThemeAssessment};

/// Outcome of a theme write within a review insert
#[derive(Debug, Clone, Copy, Default)]
pub struct ThemeWriteStats {
    /// Theme rows actually inserted
    pub inserted: usize,
    /// Theme rows dropped by the (review_id, theme) uniqueness rule
    pub duplicates_ignored: usize,
}

/// Insert an analyzed review together with its themes, atomically
///
/// Duplicate theme labels for the same review are ignored rather than
/// rejected; the first assessment wins.
pub async fn insert_review_with_themes(
    pool: &SqlitePool,
    review: &NewReview,
    themes: &[ThemeAssessment],
) -> sqlx::Result<ThemeWriteStats> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO reviews (id, batch_id, raw_text, language_code, overall_sentiment, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(review.id.to_string())
    .bind(review.batch_id.to_string())
    .bind(&review.raw_text)
    .bind(&review.language_code)
    .bind(review.overall_sentiment.as_str())
    .bind(review.created_at.to_rfc3339())
    .execute(&mut *tx)
    .await?;

    let mut stats = ThemeWriteStats::default();
    for theme in themes {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO review_themes (id, review_id, theme, sentiment)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(review.id.to_string())
        .bind(&theme.theme)
        .bind(theme.sentiment.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            stats.duplicates_ignored += 1;
        } else {
            stats.inserted += 1;
        }
    }

    tx.commit().await?;

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{batches, connect_in_memory};
    use crate::models::{ImportBatch, Sentiment, SourceKind};

    async fn seeded_batch(pool: &SqlitePool) -> Uuid {
        let batch = ImportBatch::new(SourceKind::Csv, None, None);
        batches::insert_batch(pool, &batch).await.unwrap();
        batch.id
    }

    #[tokio::test]
    async fn review_and_themes_commit_together() {
        let pool = connect_in_memory().await.unwrap();
        let batch_id = seeded_batch(&pool).await;

        let review = NewReview::new(
            batch_id,
            "Checkout froze twice before the order went through".to_string(),
            Some("en".to_string()),
            Sentiment::Negative,
        );
        let themes = vec![
            ThemeAssessment {
                theme: "checkout".to_string(),
                sentiment: Sentiment::Negative,
            },
            ThemeAssessment {
                theme: "website usability".to_string(),
                sentiment: Sentiment::Negative,
            },
        ];

        let stats = insert_review_with_themes(&pool, &review, &themes)
            .await
            .unwrap();
        assert_eq!(stats.inserted, 2);
        assert_eq!(stats.duplicates_ignored, 0);

        let theme_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM review_themes WHERE review_id = ?")
                .bind(review.id.to_string())
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(theme_count, 2);
    }

    #[tokio::test]
    async fn duplicate_theme_labels_are_ignored() {
        let pool = connect_in_memory().await.unwrap();
        let batch_id = seeded_batch(&pool).await;

        let review = NewReview::new(
            batch_id,
            "Delivery was slow, really slow".to_string(),
            None,
            Sentiment::Negative,
        );
        let themes = vec![
            ThemeAssessment {
                theme: "delivery speed".to_string(),
                sentiment: Sentiment::Negative,
            },
            ThemeAssessment {
                theme: "delivery speed".to_string(),
                sentiment: Sentiment::Neutral,
            },
        ];

        let stats = insert_review_with_themes(&pool, &review, &themes)
            .await
            .unwrap();
        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.duplicates_ignored, 1);

        // First assessment wins
        let sentiment: String =
            sqlx::query_scalar("SELECT sentiment FROM review_themes WHERE review_id = ?")
                .bind(review.id.to_string())
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(sentiment, "negative");
    }

    #[tokio::test]
    async fn insert_fails_for_unknown_batch() {
        let pool = connect_in_memory().await.unwrap();

        let review = NewReview::new(
            Uuid::new_v4(),
            "Orphan review".to_string(),
            None,
            Sentiment::Neutral,
        );
        let result = insert_review_with_themes(&pool, &review, &[]).await;
        assert!(result.is_err(), "foreign key violation expected");
    }
}

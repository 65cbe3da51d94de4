//! Dashboard aggregation queries
//!
//! All metrics are computed over a caller-supplied date range. Timestamps are
//! stored as RFC 3339 UTC strings, which compare correctly as text, so the
//! range bounds are bound as strings.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use crate::models::Sentiment;

/// Half-open date range [start, end_exclusive)
#[derive(Debug, Clone, Copy)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end_exclusive: DateTime<Utc>,
}

impl DateRange {
    /// Parse `YYYY-MM-DD` bounds into an inclusive-by-day range
    ///
    /// The end date itself is included; the exclusive bound is midnight of
    /// the following day.
    pub fn parse(start_date: &str, end_date: &str) -> Result<DateRange, String> {
        let start = NaiveDate::parse_from_str(start_date.trim(), "%Y-%m-%d")
            .map_err(|_| format!("invalid start_date '{start_date}', expected YYYY-MM-DD"))?;
        let end = NaiveDate::parse_from_str(end_date.trim(), "%Y-%m-%d")
            .map_err(|_| format!("invalid end_date '{end_date}', expected YYYY-MM-DD"))?;

        if end < start {
            return Err("end_date precedes start_date".to_string());
        }

        let end_exclusive = end
            .checked_add_days(Days::new(1))
            .ok_or_else(|| "end_date out of range".to_string())?;

        Ok(DateRange {
            start: Utc.from_utc_datetime(&start.and_time(NaiveTime::MIN)),
            end_exclusive: Utc.from_utc_datetime(&end_exclusive.and_time(NaiveTime::MIN)),
        })
    }

    fn start_bound(&self) -> String {
        self.start.to_rfc3339()
    }

    fn end_bound(&self) -> String {
        self.end_exclusive.to_rfc3339()
    }
}

/// Review counts per sentiment label
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct SentimentCounts {
    pub positive: i64,
    pub neutral: i64,
    pub negative: i64,
}

/// A theme label with its mention count
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ThemeCount {
    pub theme: String,
    pub count: i64,
}

/// Review count for one calendar day
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DayCount {
    pub day: String,
    pub count: i64,
}

/// Total reviews in range
pub async fn total_reviews(pool: &SqlitePool, range: &DateRange) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE created_at >= ? AND created_at < ?")
        .bind(range.start_bound())
        .bind(range.end_bound())
        .fetch_one(pool)
        .await
}

/// Review counts grouped by overall sentiment
pub async fn sentiment_distribution(
    pool: &SqlitePool,
    range: &DateRange,
) -> sqlx::Result<SentimentCounts> {
    let rows = sqlx::query(
        r#"
        SELECT overall_sentiment AS sentiment, COUNT(*) AS cnt
        FROM reviews
        WHERE created_at >= ? AND created_at < ? AND overall_sentiment IS NOT NULL
        GROUP BY overall_sentiment
        "#,
    )
    .bind(range.start_bound())
    .bind(range.end_bound())
    .fetch_all(pool)
    .await?;

    let mut counts = SentimentCounts::default();
    for row in rows {
        let sentiment: String = row.get("sentiment");
        let cnt: i64 = row.get("cnt");
        match Sentiment::parse(&sentiment) {
            Some(Sentiment::Positive) => counts.positive = cnt,
            Some(Sentiment::Neutral) => counts.neutral = cnt,
            Some(Sentiment::Negative) => counts.negative = cnt,
            // CHECK constraint makes this unreachable; skip rather than fail
            None => tracing::warn!(sentiment, "unexpected sentiment label in reviews table"),
        }
    }

    Ok(counts)
}

/// Average sentiment score over the range
///
/// Scores: positive = 5, neutral = 3, negative = 1. Returns 0.0 when the
/// range holds no scored reviews.
pub async fn avg_sentiment_score(pool: &SqlitePool, range: &DateRange) -> sqlx::Result<f64> {
    let avg: Option<f64> = sqlx::query_scalar(
        r#"
        SELECT AVG(CASE overall_sentiment
                     WHEN 'positive' THEN 5.0
                     WHEN 'neutral' THEN 3.0
                     WHEN 'negative' THEN 1.0
                   END)
        FROM reviews
        WHERE created_at >= ? AND created_at < ?
        "#,
    )
    .bind(range.start_bound())
    .bind(range.end_bound())
    .fetch_one(pool)
    .await?;

    Ok((avg.unwrap_or(0.0) * 100.0).round() / 100.0)
}

/// Total theme mentions in range
pub async fn total_theme_mentions(pool: &SqlitePool, range: &DateRange) -> sqlx::Result<i64> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM review_themes rt
        JOIN reviews r ON r.id = rt.review_id
        WHERE r.created_at >= ? AND r.created_at < ?
        "#,
    )
    .bind(range.start_bound())
    .bind(range.end_bound())
    .fetch_one(pool)
    .await
}

/// Theme mentions with neutral or negative sentiment in range
pub async fn non_positive_theme_mentions(
    pool: &SqlitePool,
    range: &DateRange,
) -> sqlx::Result<i64> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM review_themes rt
        JOIN reviews r ON r.id = rt.review_id
        WHERE r.created_at >= ? AND r.created_at < ?
          AND rt.sentiment IN ('neutral', 'negative')
        "#,
    )
    .bind(range.start_bound())
    .bind(range.end_bound())
    .fetch_one(pool)
    .await
}

/// Most mentioned themes with the given sentiment, descending by count
pub async fn top_themes(
    pool: &SqlitePool,
    range: &DateRange,
    sentiment: Sentiment,
    limit: u32,
) -> sqlx::Result<Vec<ThemeCount>> {
    let rows = sqlx::query(
        r#"
        SELECT rt.theme, COUNT(*) AS cnt
        FROM review_themes rt
        JOIN reviews r ON r.id = rt.review_id
        WHERE r.created_at >= ? AND r.created_at < ? AND rt.sentiment = ?
        GROUP BY rt.theme
        ORDER BY cnt DESC, rt.theme ASC
        LIMIT ?
        "#,
    )
    .bind(range.start_bound())
    .bind(range.end_bound())
    .bind(sentiment.as_str())
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| ThemeCount {
            theme: row.get("theme"),
            count: row.get("cnt"),
        })
        .collect())
}

/// Most mentioned neutral-or-negative themes, descending by count
///
/// This feeds the recommendation prompt: recurring non-positive themes are
/// the problems worth proposing fixes for.
pub async fn non_positive_theme_counts(
    pool: &SqlitePool,
    range: &DateRange,
    limit: u32,
) -> sqlx::Result<Vec<ThemeCount>> {
    let rows = sqlx::query(
        r#"
        SELECT rt.theme, COUNT(*) AS cnt
        FROM review_themes rt
        JOIN reviews r ON r.id = rt.review_id
        WHERE r.created_at >= ? AND r.created_at < ?
          AND rt.sentiment IN ('neutral', 'negative')
        GROUP BY rt.theme
        ORDER BY cnt DESC, rt.theme ASC
        LIMIT ?
        "#,
    )
    .bind(range.start_bound())
    .bind(range.end_bound())
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| ThemeCount {
            theme: row.get("theme"),
            count: row.get("cnt"),
        })
        .collect())
}

/// Per-day review counts for one sentiment, ascending by day
pub async fn daily_counts(
    pool: &SqlitePool,
    range: &DateRange,
    sentiment: Sentiment,
) -> sqlx::Result<Vec<DayCount>> {
    let rows = sqlx::query(
        r#"
        SELECT date(created_at) AS day, COUNT(*) AS cnt
        FROM reviews
        WHERE created_at >= ? AND created_at < ? AND overall_sentiment = ?
        GROUP BY day
        ORDER BY day ASC
        "#,
    )
    .bind(range.start_bound())
    .bind(range.end_bound())
    .bind(sentiment.as_str())
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| DayCount {
            day: row.get("day"),
            count: row.get("cnt"),
        })
        .collect())
}

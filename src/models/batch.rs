//! Import batch records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Origin of an import batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Uploaded CSV file
    Csv,
    /// Uploaded Excel export (parsed as delimited text)
    Excel,
    /// Pushed through a partner API integration
    Api,
}

impl SourceKind {
    /// Canonical label as stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Csv => "csv",
            SourceKind::Excel => "excel",
            SourceKind::Api => "api",
        }
    }

    /// Parse a label, tolerating surrounding whitespace and case
    pub fn parse(label: &str) -> Option<SourceKind> {
        match label.trim().to_ascii_lowercase().as_str() {
            "csv" => Some(SourceKind::Csv),
            "excel" => Some(SourceKind::Excel),
            "api" => Some(SourceKind::Api),
            _ => None,
        }
    }
}

/// A batch of reviews accepted in a single import
#[derive(Debug, Clone)]
pub struct ImportBatch {
    pub id: Uuid,
    pub source_type: SourceKind,
    /// Original filename of the upload, when known
    pub source_name: Option<String>,
    /// Caller-supplied metadata, stored verbatim
    pub meta_info: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl ImportBatch {
    /// Create a batch record for a newly accepted import
    pub fn new(
        source_type: SourceKind,
        source_name: Option<String>,
        meta_info: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_type,
            source_name,
            meta_info,
            created_at: Utc::now(),
        }
    }
}

/// Batch listing entry with its persisted review count
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub id: Uuid,
    pub source_type: SourceKind,
    pub source_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub review_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_parse_round_trips() {
        for kind in [SourceKind::Csv, SourceKind::Excel, SourceKind::Api] {
            assert_eq!(SourceKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(SourceKind::parse(" CSV "), Some(SourceKind::Csv));
        assert_eq!(SourceKind::parse("xml"), None);
    }

    #[test]
    fn new_batch_gets_unique_ids() {
        let a = ImportBatch::new(SourceKind::Csv, None, None);
        let b = ImportBatch::new(SourceKind::Csv, None, None);
        assert_ne!(a.id, b.id);
    }
}

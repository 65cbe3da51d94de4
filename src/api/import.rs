//! Review import API handlers
//!
//! POST /api/reviews/import, GET /api/reviews/last_imports

use axum::{
    body::Bytes,
    extract::{multipart::Field, Multipart, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::batches;
use crate::error::{ApiError, ApiResult};
use crate::models::{BatchSummary, ImportBatch, SourceKind};
use crate::services::batch_parser;
use crate::services::batch_processor::BatchJob;
use crate::AppState;

const DEFAULT_LAST_IMPORTS: u32 = 10;
const MAX_LAST_IMPORTS: u32 = 100;

/// POST /api/reviews/import response
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub status: String,
    /// Rows the upload parsed into; the background job attempts exactly these
    pub imported_count: usize,
    pub batch_id: Uuid,
}

/// GET /api/reviews/last_imports query parameters
#[derive(Debug, Deserialize)]
pub struct LastImportsParams {
    pub limit: Option<u32>,
}

/// GET /api/reviews/last_imports response
#[derive(Debug, Serialize)]
pub struct LastImportsResponse {
    pub batches: Vec<BatchSummary>,
}

/// Collected multipart form fields
#[derive(Default)]
struct ImportForm {
    file: Option<Bytes>,
    file_name: Option<String>,
    source: Option<String>,
    delimiter: Option<String>,
    encoding: Option<String>,
    language: Option<String>,
    metadata: Option<String>,
}

async fn text_field(field: Field<'_>, name: &str) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("failed to read {name} field: {e}")))
}

async fn read_form(mut multipart: Multipart) -> ApiResult<ImportForm> {
    let mut form = ImportForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart request: {e}")))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        match name.as_str() {
            "file" => {
                form.file_name = field.file_name().map(str::to_owned);
                form.file = Some(field.bytes().await.map_err(|e| {
                    ApiError::BadRequest(format!("failed to read file field: {e}"))
                })?);
            }
            "source" => form.source = Some(text_field(field, "source").await?),
            "delimiter" => form.delimiter = Some(text_field(field, "delimiter").await?),
            "encoding" => form.encoding = Some(text_field(field, "encoding").await?),
            "language" => form.language = Some(text_field(field, "language").await?),
            "metadata" => form.metadata = Some(text_field(field, "metadata").await?),
            _ => {}
        }
    }

    Ok(form)
}

/// POST /api/reviews/import
///
/// Accepts a delimited review file, counts its rows, and schedules the batch
/// for background analysis. Returns immediately; progress is observable via
/// GET /api/analysis/status and the event stream. A second import while one
/// is running is rejected with 409.
pub async fn import_reviews(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ImportResponse>> {
    let form = read_form(multipart).await?;

    let bytes = form
        .file
        .ok_or_else(|| ApiError::BadRequest("missing file field".to_string()))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("uploaded file is empty".to_string()));
    }

    let source = match form.source.as_deref().map(str::trim) {
        None | Some("") => SourceKind::Csv,
        Some(raw) => SourceKind::parse(raw)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown source type: {raw}")))?,
    };

    // Only UTF-8 uploads are supported; anything else still decodes, with
    // replacement characters for the bytes that don't fit.
    if let Some(encoding) = form.encoding.as_deref().map(str::trim) {
        if !encoding.is_empty()
            && !encoding.eq_ignore_ascii_case("utf-8")
            && !encoding.eq_ignore_ascii_case("utf8")
        {
            tracing::warn!(encoding, "unsupported encoding requested, decoding as UTF-8");
        }
    }

    let delimiter = batch_parser::parse_delimiter(form.delimiter.as_deref().unwrap_or(""))
        .map_err(ApiError::BadRequest)?;

    let metadata = match form.metadata.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            serde_json::from_str::<serde_json::Value>(raw)
                .map_err(|e| ApiError::BadRequest(format!("metadata is not valid JSON: {e}")))?,
        ),
    };

    let language = form.language.and_then(|l| {
        let l = l.trim().to_owned();
        (!l.is_empty()).then_some(l)
    });

    let decoded = batch_parser::decode_upload(&bytes);
    if decoded.lossy {
        tracing::warn!(
            file = form.file_name.as_deref().unwrap_or("<unnamed>"),
            "upload contained invalid UTF-8, decoded with replacement characters"
        );
    }

    let row_count = batch_parser::extract_rows(&decoded.text, delimiter).len();
    if row_count == 0 {
        return Err(ApiError::BadRequest(
            "no review rows found in upload".to_string(),
        ));
    }

    // Win the gate before writing the batch record so two racing submits can
    // never both schedule work.
    let Some(guard) = state.busy_gate.try_acquire() else {
        return Err(ApiError::Conflict(
            "batch analysis already in progress".to_string(),
        ));
    };

    let batch = ImportBatch::new(source, form.file_name, metadata);
    batches::insert_batch(&state.db, &batch).await?;

    // New data makes the cached recommendation report stale
    state.recommendations.invalidate(&state.db).await?;

    state
        .jobs
        .submit(BatchJob {
            batch_id: batch.id,
            text: decoded.text,
            delimiter,
            language,
            guard,
        })
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(
        batch_id = %batch.id,
        rows = row_count,
        source = source.as_str(),
        "import batch accepted"
    );

    Ok(Json(ImportResponse {
        status: "accepted".to_string(),
        imported_count: row_count,
        batch_id: batch.id,
    }))
}

/// GET /api/reviews/last_imports
///
/// Most recent batches with their persisted review counts, newest first.
pub async fn last_imports(
    State(state): State<AppState>,
    Query(params): Query<LastImportsParams>,
) -> ApiResult<Json<LastImportsResponse>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LAST_IMPORTS)
        .clamp(1, MAX_LAST_IMPORTS);

    let batches = batches::list_recent_batches(&state.db, limit).await?;

    Ok(Json(LastImportsResponse { batches }))
}

/// Build review import routes
pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/api/reviews/import", post(import_reviews))
        .route("/api/reviews/last_imports", get(last_imports))
}

//! Audio record API handlers.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use tuneshift_core::{
    AudioRecord, BlobError, BlobKey, ConversionStatus, CreateRecordRequest, FormatRegistry,
    RecordError, RecordFilter, ORIGINAL_NAMESPACE,
};

use crate::metrics::UPLOADS_TOTAL;
use crate::state::AppState;

/// Maximum allowed limit for record queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for record queries
const DEFAULT_LIMIT: i64 = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing records
#[derive(Debug, Deserialize)]
pub struct ListRecordsParams {
    /// Filter by conversion status
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Request body for re-running a conversion
#[derive(Debug, Deserialize)]
pub struct ConvertRecordBody {
    /// Switch to this target before converting
    pub target_format: Option<String>,
}

/// Response for record operations
#[derive(Debug, Serialize)]
pub struct RecordResponse {
    pub id: String,
    pub title: String,
    pub artist: Option<String>,
    pub display_name: String,
    pub original_name: String,
    pub original_extension: String,
    pub target_extension: String,
    pub status: ConversionStatus,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error_message: String,
    pub uploaded_at: String,
    pub converted_at: Option<String>,
    /// Filename served by the download endpoint, once converted.
    pub converted_filename: Option<String>,
}

impl From<AudioRecord> for RecordResponse {
    fn from(record: AudioRecord) -> Self {
        let converted_filename = record
            .is_converted()
            .then(|| record.converted_filename());
        Self {
            display_name: record.display_name(),
            id: record.id,
            title: record.title,
            artist: record.artist,
            original_name: record.original_name,
            original_extension: record.original_extension,
            target_extension: record.target_extension,
            status: record.status,
            error_message: record.error_message,
            uploaded_at: record.uploaded_at.to_rfc3339(),
            converted_at: record.converted_at.map(|t| t.to_rfc3339()),
            converted_filename,
        }
    }
}

/// Response for listing records
#[derive(Debug, Serialize)]
pub struct ListRecordsResponse {
    pub records: Vec<RecordResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Response for a conversion request
#[derive(Debug, Serialize)]
pub struct ConvertRecordResponse {
    pub converted: bool,
    pub record: RecordResponse,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

fn record_error(id: &str, e: RecordError) -> ApiError {
    match e {
        RecordError::NotFound(_) => {
            api_error(StatusCode::NOT_FOUND, format!("Record not found: {}", id))
        }
        RecordError::UnsupportedFormat(e) => api_error(StatusCode::BAD_REQUEST, e.to_string()),
        RecordError::Conflict { .. } => api_error(StatusCode::CONFLICT, e.to_string()),
        RecordError::Database(_) => api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

fn load_record(state: &AppState, id: &str) -> Result<AudioRecord, ApiError> {
    match state.records().get(id) {
        Ok(Some(record)) => Ok(record),
        Ok(None) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Record not found: {}", id),
        )),
        Err(e) => Err(record_error(id, e)),
    }
}

/// Filename safe to put in a quoted Content-Disposition parameter.
fn attachment_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/records
///
/// Multipart upload with fields `file`, `title`, `artist` and
/// `target_format`. Stores the original, creates a pending record and
/// converts it before responding.
pub async fn upload_record(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<RecordResponse>), ApiError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut title: Option<String> = None;
    let mut artist: Option<String> = None;
    let mut target: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                UPLOADS_TOTAL.with_label_values(&["rejected"]).inc();
                return Err(api_error(
                    StatusCode::BAD_REQUEST,
                    format!("Invalid multipart body: {}", e),
                ));
            }
        };

        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                filename = field.file_name().map(|s| s.to_string());
                match field.bytes().await {
                    Ok(bytes) => file_data = Some(bytes.to_vec()),
                    Err(e) => {
                        UPLOADS_TOTAL.with_label_values(&["rejected"]).inc();
                        return Err(api_error(
                            StatusCode::BAD_REQUEST,
                            format!("Failed to read file: {}", e),
                        ));
                    }
                }
            }
            "title" => title = field.text().await.ok().filter(|t| !t.trim().is_empty()),
            "artist" => artist = field.text().await.ok().filter(|t| !t.trim().is_empty()),
            "target_format" => {
                target = field.text().await.ok().filter(|t| !t.trim().is_empty())
            }
            _ => {}
        }
    }

    let data = match file_data {
        Some(d) if !d.is_empty() => d,
        _ => {
            UPLOADS_TOTAL.with_label_values(&["rejected"]).inc();
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "No audio file provided",
            ));
        }
    };

    let target = target.unwrap_or_else(|| state.config().server.default_target.clone());
    if let Err(e) = FormatRegistry::lookup(&target) {
        UPLOADS_TOTAL.with_label_values(&["rejected"]).inc();
        return Err(api_error(StatusCode::BAD_REQUEST, e.to_string()));
    }

    let original_name = filename
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| "upload".to_string());
    let title = title.unwrap_or_else(|| {
        let base = original_name.rsplit(['/', '\\']).next().unwrap_or(&original_name);
        match base.rfind('.') {
            Some(idx) if idx > 0 => base[..idx].to_string(),
            _ => base.to_string(),
        }
    });

    let original_key = state
        .blobs()
        .put(ORIGINAL_NAMESPACE, &original_name, &data)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let request = CreateRecordRequest {
        title: title.trim().to_string(),
        artist: artist.map(|a| a.trim().to_string()),
        original_name,
        target_extension: target,
        original_key: Some(original_key.clone()),
    };

    let mut record = match state.records().create(request) {
        Ok(record) => record,
        Err(e) => {
            discard_blob(&state, &original_key).await;
            return Err(record_error("", e));
        }
    };
    UPLOADS_TOTAL.with_label_values(&["accepted"]).inc();
    info!(
        record_id = %record.id,
        original = %record.original_name,
        format = %record.target_extension,
        bytes = data.len(),
        "Upload stored"
    );

    state.conversions().attempt_conversion(&mut record).await;

    Ok((StatusCode::CREATED, Json(RecordResponse::from(record))))
}

/// GET /api/v1/records
pub async fn list_records(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListRecordsParams>,
) -> Result<Json<ListRecordsResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = RecordFilter::new().with_limit(limit).with_offset(offset);

    if let Some(ref status) = params.status {
        let status = status
            .parse::<ConversionStatus>()
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
        filter = filter.with_status(status);
    }

    let records = state
        .records()
        .list(&filter)
        .map_err(|e| record_error("", e))?;
    let total = state
        .records()
        .count(&filter)
        .map_err(|e| record_error("", e))?;

    Ok(Json(ListRecordsResponse {
        records: records.into_iter().map(RecordResponse::from).collect(),
        total,
        limit,
        offset,
    }))
}

/// GET /api/v1/records/{id}
pub async fn get_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RecordResponse>, ApiError> {
    let record = load_record(&state, &id)?;
    Ok(Json(RecordResponse::from(record)))
}

/// POST /api/v1/records/{id}/convert
///
/// Optionally switches the target format, then converts again.
pub async fn convert_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<Json<ConvertRecordBody>>,
) -> Result<Json<ConvertRecordResponse>, ApiError> {
    let target = body.and_then(|Json(b)| b.target_format);

    let mut record = load_record(&state, &id)?;
    if let Some(target) = target {
        if target != record.target_extension {
            record = state
                .records()
                .set_target(&id, &target)
                .map_err(|e| record_error(&id, e))?;
        }
    }

    let converted = state.conversions().attempt_conversion(&mut record).await;

    Ok(Json(ConvertRecordResponse {
        converted,
        record: RecordResponse::from(record),
    }))
}

/// GET /api/v1/records/{id}/download
pub async fn download_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let record = load_record(&state, &id)?;

    let key = match (&record.converted_key, record.status) {
        (Some(key), ConversionStatus::Success) => key,
        _ => {
            return Err(api_error(
                StatusCode::NOT_FOUND,
                format!("Record {} has no converted file", id),
            ))
        }
    };

    let bytes = state.blobs().read(key).await.map_err(|e| match e {
        BlobError::NotFound { .. } => api_error(
            StatusCode::NOT_FOUND,
            format!("Converted file for record {} is missing", id),
        ),
        e => api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    })?;

    let mime_type = FormatRegistry::lookup(&record.target_extension)
        .map(|p| p.mime_type)
        .unwrap_or("application/octet-stream");
    let disposition = format!(
        "attachment; filename=\"{}\"",
        attachment_filename(&record.converted_filename())
    );

    Ok((
        [
            (header::CONTENT_TYPE, mime_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

/// DELETE /api/v1/records/{id}
///
/// Removes the record together with its original and converted files.
pub async fn delete_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RecordResponse>, ApiError> {
    let record = state
        .records()
        .delete(&id)
        .map_err(|e| record_error(&id, e))?;

    for key in [&record.original_key, &record.converted_key]
        .into_iter()
        .flatten()
    {
        discard_blob(&state, key).await;
    }
    info!(record_id = %record.id, "Record deleted");

    Ok(Json(RecordResponse::from(record)))
}

async fn discard_blob(state: &AppState, key: &BlobKey) {
    if let Err(e) = state.blobs().delete(key).await {
        warn!(key = %key, error = %e, "Failed to delete blob");
    }
}

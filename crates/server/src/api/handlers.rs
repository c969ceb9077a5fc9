use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tuneshift_core::{FormatRegistry, TargetFormat};

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// One supported target format.
#[derive(Debug, Serialize)]
pub struct FormatInfo {
    pub id: TargetFormat,
    pub label: &'static str,
    pub mime_type: &'static str,
    pub lossless: bool,
}

#[derive(Debug, Serialize)]
pub struct FormatsResponse {
    pub formats: Vec<FormatInfo>,
    pub default_target: String,
}

/// GET /api/v1/formats
pub async fn list_formats(State(state): State<Arc<AppState>>) -> Json<FormatsResponse> {
    let formats = TargetFormat::ALL
        .into_iter()
        .map(|format| {
            let params = FormatRegistry::params(format);
            FormatInfo {
                id: format,
                label: format.label(),
                mime_type: params.mime_type,
                lossless: params.lossless,
            }
        })
        .collect();

    Json(FormatsResponse {
        formats,
        default_target: state.config().server.default_target.clone(),
    })
}

#[derive(Debug, Serialize)]
pub struct ConverterStatusResponse {
    pub primary_enabled: bool,
    pub fallback_enabled: bool,
    pub ffmpeg_available: bool,
    /// Formats the in-process backend can produce.
    pub in_process: Vec<TargetFormat>,
    /// Formats the local ffmpeg can produce.
    pub ffmpeg: Vec<TargetFormat>,
    /// Formats no backend can produce here.
    pub unavailable: Vec<TargetFormat>,
}

/// GET /api/v1/converter/status
pub async fn converter_status(
    State(state): State<Arc<AppState>>,
) -> Json<ConverterStatusResponse> {
    let converter = &state.config().converter;
    let caps = state.capabilities();

    let ffmpeg = if converter.fallback_enabled {
        caps.ffmpeg.clone()
    } else {
        Vec::new()
    };
    let unavailable = TargetFormat::ALL
        .into_iter()
        .filter(|f| !caps.in_process.contains(f) && !ffmpeg.contains(f))
        .collect();

    Json(ConverterStatusResponse {
        primary_enabled: converter.primary_enabled,
        fallback_enabled: converter.fallback_enabled,
        ffmpeg_available: caps.ffmpeg_available,
        in_process: caps.in_process.clone(),
        ffmpeg,
        unavailable,
    })
}

/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state);
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}

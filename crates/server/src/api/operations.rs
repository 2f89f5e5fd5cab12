//! Multipart operation endpoints.
//!
//! Every endpoint takes one or more `file` parts, an optional `params` part
//! holding the operation's JSON fields and, for retag, an optional `cover`
//! part. One file yields the produced file; several run as a batch and yield
//! the zip archive.

use axum::{
    extract::{Multipart, State},
    http::{header, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

use audiokit_core::{
    BatchResult, ErrorCategory, OperationDefaults, OperationError, OperationKind,
    OperationRequest, OperationResult, ProgressCallback, ProgressEvent, SourceFile, TagSet,
};

use super::error::ApiError;
use crate::state::AppState;

const FAILED_HEADER: HeaderName = HeaderName::from_static("x-audiokit-failed");
const SKIPPED_HEADER: HeaderName = HeaderName::from_static("x-audiokit-skipped");

/// Parsed multipart request.
#[derive(Debug, Default)]
pub struct OperationForm {
    pub files: Vec<SourceFile>,
    pub cover: Option<Vec<u8>>,
    pub params: Map<String, Value>,
}

pub async fn add_noise(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    run_operation(&state, OperationKind::AddNoiseAndConcat, multipart).await
}

pub async fn extract_cover(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    run_operation(&state, OperationKind::ExtractCover, multipart).await
}

pub async fn read_metadata(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    run_operation(&state, OperationKind::ReadMetadata, multipart).await
}

pub async fn retag(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    run_operation(&state, OperationKind::RetagAudio, multipart).await
}

pub async fn convert(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    run_operation(&state, OperationKind::ConvertFormat, multipart).await
}

pub async fn trim(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    run_operation(&state, OperationKind::TrimAudio, multipart).await
}

pub async fn render_waveform(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    run_operation(&state, OperationKind::RenderWaveform, multipart).await
}

async fn run_operation(
    state: &AppState,
    kind: OperationKind,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = read_form(multipart).await?;
    if form.files.is_empty() {
        return Err(ApiError::bad_request("At least one file part is required"));
    }
    let request = build_request(kind, form.params, state.defaults(), form.cover)?;
    let files = form.files;

    if kind == OperationKind::ReadMetadata {
        return read_all_metadata(state, &files).await;
    }

    match files.as_slice() {
        [file] => {
            let result = state
                .executor()
                .run(file, &request, Some(log_progress(kind)))
                .await?;
            Ok(file_response(result))
        }
        _ => {
            let batch = state
                .batch()
                .run(&files, &request, Some(log_progress(kind)))
                .await?;
            info!(
                operation = %kind,
                produced = batch.items.len(),
                failed = batch.failures.len(),
                skipped = batch.skipped.len(),
                "Batch finished"
            );
            Ok(batch_response(batch))
        }
    }
}

/// Collects the `file`, `cover` and `params` parts.
pub async fn read_form(mut multipart: Multipart) -> Result<OperationForm, ApiError> {
    let mut form = OperationForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return Err(ApiError::bad_request(format!(
                    "Invalid multipart body: {}",
                    e
                )))
            }
        };

        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = upload_name(field.file_name(), form.files.len());
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::bad_request(format!("Failed to read {}: {}", filename, e))
                })?;
                form.files.push(SourceFile::new(filename, bytes.to_vec()));
            }
            "cover" => {
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::bad_request(format!("Failed to read cover: {}", e))
                })?;
                form.cover = Some(bytes.to_vec());
            }
            "params" => {
                let text = field.text().await.map_err(|e| {
                    ApiError::bad_request(format!("Failed to read params: {}", e))
                })?;
                form.params = parse_params(&text)?;
            }
            _ => debug!("Ignoring multipart field {:?}", name),
        }
    }

    Ok(form)
}

/// Parses the `params` part; blank means no parameters.
pub fn parse_params(text: &str) -> Result<Map<String, Value>, ApiError> {
    if text.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::bad_request("params must be a JSON object")),
        Err(e) => Err(ApiError::bad_request(format!("Invalid params JSON: {}", e))),
    }
}

/// Builds the typed request, filling unset fields from the configured defaults.
pub fn build_request(
    kind: OperationKind,
    mut params: Map<String, Value>,
    defaults: &OperationDefaults,
    cover: Option<Vec<u8>>,
) -> Result<OperationRequest, ApiError> {
    let tag = serde_json::to_value(kind)
        .map_err(|e| OperationError::invariant(format!("operation tag: {}", e)))?;
    params.insert("operation".to_string(), tag);

    if matches!(
        kind,
        OperationKind::AddNoiseAndConcat | OperationKind::ConvertFormat | OperationKind::TrimAudio
    ) {
        params
            .entry("bitrate")
            .or_insert_with(|| Value::from(defaults.bitrate.clone()));
    }
    if kind == OperationKind::TrimAudio {
        params
            .entry("silence_threshold_db")
            .or_insert_with(|| Value::from(defaults.silence_threshold_db));
        params
            .entry("silence_duration_secs")
            .or_insert_with(|| Value::from(defaults.silence_duration_secs));
    }

    let mut request: OperationRequest = serde_json::from_value(Value::Object(params))
        .map_err(|e| ApiError::bad_request(format!("Invalid params: {}", e)))?;

    match (&mut request, cover) {
        (OperationRequest::RetagAudio(retag), Some(cover)) => retag.cover = Some(cover),
        (_, Some(_)) => {
            return Err(ApiError::bad_request(format!(
                "{} does not accept a cover part",
                kind
            )))
        }
        (_, None) => {}
    }

    Ok(request)
}

/// Tags read from one file of a multi-file metadata request.
#[derive(Debug, Serialize)]
pub struct MetadataItem {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<TagSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
}

#[derive(Debug, Serialize)]
pub struct MetadataResponse {
    pub files: Vec<MetadataItem>,
}

async fn read_all_metadata(state: &AppState, files: &[SourceFile]) -> Result<Response, ApiError> {
    if let [file] = files {
        let tags = state.executor().read_metadata(file, None).await?;
        return Ok(Json(tags).into_response());
    }

    let mut items = Vec::with_capacity(files.len());
    let mut first_error = None;
    for file in files {
        match state.executor().read_metadata(file, None).await {
            Ok(tags) => items.push(MetadataItem {
                file: file.name.clone(),
                tags: Some(tags),
                error: None,
                category: None,
            }),
            Err(e) if !e.is_recoverable() => return Err(e.into()),
            Err(e) => {
                items.push(MetadataItem {
                    file: file.name.clone(),
                    tags: None,
                    error: Some(e.to_string()),
                    category: Some(e.category()),
                });
                first_error.get_or_insert(e);
            }
        }
    }

    if items.iter().all(|item| item.tags.is_none()) {
        if let Some(e) = first_error {
            return Err(e.into());
        }
    }
    Ok(Json(MetadataResponse { files: items }).into_response())
}

fn log_progress(kind: OperationKind) -> ProgressCallback {
    Arc::new(move |event: ProgressEvent| {
        debug!(operation = %kind, percent = event.percent, "Progress");
    })
}

fn file_response(result: OperationResult) -> Response {
    let disposition = content_disposition(&result.filename);
    (
        [
            (header::CONTENT_TYPE, result.mime_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        result.bytes,
    )
        .into_response()
}

fn batch_response(batch: BatchResult) -> Response {
    let failed = batch.failures.len();
    let skipped = batch.skipped.len();
    let mut response = file_response(batch.archive);
    let headers = response.headers_mut();
    headers.insert(FAILED_HEADER, HeaderValue::from(failed));
    headers.insert(SKIPPED_HEADER, HeaderValue::from(skipped));
    response
}

/// Base name of an uploaded file, without any client-side directories.
pub fn upload_name(file_name: Option<&str>, index: usize) -> String {
    file_name
        .and_then(|name| name.rsplit(['/', '\\']).next())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("upload_{}", index + 1))
}

/// `Content-Disposition` with an ASCII fallback and the UTF-8 name.
pub fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    )
}

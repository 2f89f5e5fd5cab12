use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use audiokit_core::format::{capabilities, describe};
use audiokit_core::{AudioFormat, EngineStatus, FormatDescriptor, SanitizedConfig};

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub engine: EngineStatus,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        engine: state.manager().status().await,
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

/// One registry entry with its encoding constraints.
#[derive(Serialize)]
pub struct FormatInfo {
    #[serde(flatten)]
    pub descriptor: FormatDescriptor,
    pub allowed_sample_rates: &'static [u32],
    pub allowed_channel_counts: &'static [u8],
}

#[derive(Serialize)]
pub struct FormatsResponse {
    pub formats: Vec<FormatInfo>,
}

pub async fn list_formats() -> Json<FormatsResponse> {
    let formats = AudioFormat::ALL
        .iter()
        .map(|&format| {
            let caps = capabilities(format);
            FormatInfo {
                descriptor: describe(format),
                allowed_sample_rates: caps.allowed_sample_rates,
                allowed_channel_counts: caps.allowed_channel_counts,
            }
        })
        .collect();
    Json(FormatsResponse { formats })
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state).await;
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}

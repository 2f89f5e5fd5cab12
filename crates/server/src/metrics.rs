//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the audiokit server:
//! - HTTP request metrics (latency, counts, in flight)
//! - Engine lifecycle state (collected dynamically)
//! - Core operation and batch metrics, registered from `audiokit_core::metrics`

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use tracing::warn;

use audiokit_core::EngineStatus;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "audiokit_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("audiokit_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "audiokit_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Engine Metrics
// =============================================================================

/// Engine lifecycle state, one-hot over `unloaded`, `loading`, `loaded`.
pub static ENGINE_STATE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("audiokit_engine_state", "Current engine lifecycle state"),
        &["state"],
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Engine
    registry.register(Box::new(ENGINE_STATE.clone())).unwrap();

    // Core metrics (operations, engine loads, batches)
    for metric in audiokit_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the engine gauge reflects the current state.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let current = match state.manager().status().await {
        EngineStatus::Unloaded => "unloaded",
        EngineStatus::Loading => "loading",
        EngineStatus::Loaded { .. } => "loaded",
    };
    for label in ["unloaded", "loading", "loaded"] {
        ENGINE_STATE
            .with_label_values(&[label])
            .set(i64::from(label == current));
    }
}

/// Label for the request path.
///
/// Uses the matched route template when routing succeeded, so unknown paths
/// collapse into a single series.
pub fn path_label(matched: Option<&str>) -> String {
    matched.unwrap_or("unmatched").to_string()
}

//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Operations (results, durations)
//! - Engine lifecycle (load attempts by build)
//! - Batches (per-item outcomes)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Operation Metrics
// =============================================================================

/// Operations total by kind and result.
pub static OPERATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("audiokit_operations_total", "Total audio operations"),
        &["operation", "result"], // result: "success" or an error category
    )
    .unwrap()
});

/// Operation duration in seconds.
pub static OPERATION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "audiokit_operation_duration_seconds",
            "Duration of audio operations",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0]),
        &["operation"],
    )
    .unwrap()
});

// =============================================================================
// Engine Metrics
// =============================================================================

/// Engine load attempts by build and result.
pub static ENGINE_LOADS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("audiokit_engine_loads_total", "Total engine load attempts"),
        &["build", "result"], // build: "multi", "single"; result: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Batch Metrics
// =============================================================================

/// Batch items by outcome.
pub static BATCH_ITEMS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("audiokit_batch_items_total", "Total batch items processed"),
        &["result"], // "success", "failed", "skipped"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(OPERATIONS_TOTAL.clone()),
        Box::new(OPERATION_DURATION.clone()),
        Box::new(ENGINE_LOADS.clone()),
        Box::new(BATCH_ITEMS.clone()),
    ]
}

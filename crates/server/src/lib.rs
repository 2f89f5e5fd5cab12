//! HTTP shell around the audiokit core.
//!
//! Exposes one multipart endpoint per operation under `/api/v1`, plus
//! health, configuration, format registry and Prometheus endpoints.

pub mod api;
pub mod metrics;
pub mod state;

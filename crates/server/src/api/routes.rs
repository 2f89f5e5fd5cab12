use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::middleware::metrics_middleware;
use super::{handlers, operations};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.body_limit();

    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/formats", get(handlers::list_formats))
        // Operations (multipart)
        .route("/noise", post(operations::add_noise))
        .route("/cover", post(operations::extract_cover))
        .route("/metadata", post(operations::read_metadata))
        .route("/retag", post(operations::retag))
        .route("/convert", post(operations::convert))
        .route("/trim", post(operations::trim))
        .route("/waveform", post(operations::render_waveform))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(Arc::clone(&state));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

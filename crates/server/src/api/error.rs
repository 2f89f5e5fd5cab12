//! Mapping of operation failures onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use audiokit_core::{BatchError, BatchItemFailure, ErrorCategory, OperationError};

/// Error body returned by every operation endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub category: ErrorCategory,
    /// Per-file failures when a whole batch produced nothing.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<BatchItemFailure>,
}

/// A failed request.
#[derive(Debug)]
pub struct ApiError {
    category: ErrorCategory,
    message: String,
    failures: Vec<BatchItemFailure>,
}

impl ApiError {
    /// A malformed request that never reached the core.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            category: ErrorCategory::Validation,
            message: message.into(),
            failures: Vec::new(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn status(&self) -> StatusCode {
        status_for(self.category)
    }
}

/// HTTP status for an error category.
pub fn status_for(category: ErrorCategory) -> StatusCode {
    match category {
        ErrorCategory::Validation => StatusCode::BAD_REQUEST,
        ErrorCategory::NoCover => StatusCode::NOT_FOUND,
        ErrorCategory::EngineLoad => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCategory::Execution => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCategory::Invariant => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<OperationError> for ApiError {
    fn from(e: OperationError) -> Self {
        Self {
            category: e.category(),
            message: e.to_string(),
            failures: Vec::new(),
        }
    }
}

impl From<BatchError> for ApiError {
    fn from(e: BatchError) -> Self {
        let category = e.category();
        let message = e.to_string();
        let failures = match e {
            BatchError::NoResults { failures, .. } => failures,
            _ => Vec::new(),
        };
        Self {
            category,
            message,
            failures,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ErrorResponse {
                error: self.message,
                category: self.category,
                failures: self.failures,
            }),
        )
            .into_response()
    }
}

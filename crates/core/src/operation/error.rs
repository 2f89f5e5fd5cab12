//! Error types for the operation module.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::engine::EngineError;
use crate::format::FormatError;

/// Failure category of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    EngineLoad,
    Validation,
    NoCover,
    Execution,
    Invariant,
}

impl ErrorCategory {
    /// Metric/log label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::EngineLoad => "engine_load",
            Self::Validation => "validation",
            Self::NoCover => "no_cover",
            Self::Execution => "execution",
            Self::Invariant => "invariant",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Errors that can occur while running one operation.
#[derive(Debug, Error)]
pub enum OperationError {
    /// The engine could not be loaded. Retrying later may succeed.
    #[error("{message}")]
    EngineLoad { message: String },

    /// Caller-supplied parameters were rejected before touching the engine.
    #[error("Invalid request: {reason}")]
    Validation { reason: String },

    /// The input carries no cover image.
    #[error("No cover art found in {file}")]
    NoCover { file: String },

    /// The engine failed or produced no output.
    #[error("{}", render_execution(.reason, .log))]
    Execution { reason: String, log: Vec<String> },

    /// A request that should have been impossible to construct.
    #[error("Internal error: {reason}")]
    Invariant { reason: String },
}

fn render_execution(reason: &str, log: &[String]) -> String {
    if log.is_empty() {
        format!("Engine command failed: {}", reason)
    } else {
        format!("Engine command failed: {}\n{}", reason, log.join("\n"))
    }
}

impl OperationError {
    /// Creates a validation error.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Creates an execution error with the engine's recent log lines.
    pub fn execution(reason: impl Into<String>, log: Vec<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
            log,
        }
    }

    /// Creates an invariant violation.
    pub fn invariant(reason: impl Into<String>) -> Self {
        Self::Invariant {
            reason: reason.into(),
        }
    }

    /// Creates a missing-cover error.
    pub fn no_cover(file: impl Into<String>) -> Self {
        Self::NoCover { file: file.into() }
    }

    /// Taxonomy tag of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::EngineLoad { .. } => ErrorCategory::EngineLoad,
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::NoCover { .. } => ErrorCategory::NoCover,
            Self::Execution { .. } => ErrorCategory::Execution,
            Self::Invariant { .. } => ErrorCategory::Invariant,
        }
    }

    /// Whether a batch may continue past this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Invariant { .. })
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::EngineLoad { .. })
    }

    /// Engine log lines attached to an execution failure.
    pub fn log_tail(&self) -> &[String] {
        match self {
            Self::Execution { log, .. } => log,
            _ => &[],
        }
    }
}

impl From<FormatError> for OperationError {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::UnknownFormat(_) => Self::invariant(err.to_string()),
            other => Self::validation(other.to_string()),
        }
    }
}

impl From<EngineError> for OperationError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Unavailable { .. }
            | EngineError::LoadFailed { .. }
            | EngineError::BinaryNotFound { .. } => Self::EngineLoad {
                message: err.to_string(),
            },
            EngineError::InvalidFileName { .. } => Self::invariant(err.to_string()),
            other => Self::execution(other.to_string(), Vec::new()),
        }
    }
}

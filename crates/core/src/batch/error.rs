//! Error types for the batch module.

use serde::Serialize;
use thiserror::Error;

use crate::operation::{ErrorCategory, OperationError, OperationKind};

/// One file that failed within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchItemFailure {
    pub file: String,
    pub category: ErrorCategory,
    pub message: String,
}

/// Errors that end a batch.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The batch had no input files.
    #[error("No input files")]
    Empty,

    /// The operation does not produce files and cannot be batched.
    #[error("{0} cannot run as a batch")]
    Unsupported(OperationKind),

    /// Not a single file produced a result.
    #[error("No file was processed successfully ({} failed, {} skipped)", .failures.len(), .skipped.len())]
    NoResults {
        failures: Vec<BatchItemFailure>,
        skipped: Vec<String>,
    },

    /// An unrecoverable failure stopped the batch.
    #[error("Batch aborted at {file}: {source}")]
    Aborted {
        file: String,
        #[source]
        source: OperationError,
    },

    /// Packaging the archive failed.
    #[error("Failed to build archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// I/O error while packaging.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BatchError {
    /// Category the batch failure maps to for callers.
    ///
    /// A batch where every file lacked a cover reports `NoCover`; other
    /// empty batches report the first failure's category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Empty | Self::Unsupported(_) => ErrorCategory::Validation,
            Self::NoResults { failures, .. } => failures
                .first()
                .map(|failure| failure.category)
                .unwrap_or(ErrorCategory::NoCover),
            Self::Aborted { source, .. } => source.category(),
            Self::Archive(_) | Self::Io(_) => ErrorCategory::Invariant,
        }
    }
}

//! Error types for the engine module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the transcoding engine contract.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Engine binary not found.
    #[error("FFmpeg not found at path: {path}")]
    BinaryNotFound { path: PathBuf },

    /// Loading the engine failed for another reason.
    #[error("Engine load failed: {reason}")]
    LoadFailed { reason: String },

    /// The engine could not be made available to callers.
    ///
    /// Produced by the lifecycle manager after a failed load attempt; the next
    /// call retries.
    #[error(
        "Audio engine failed to load ({reason}). A content/script blocker or security \
         policy may be preventing the engine from starting."
    )]
    Unavailable { reason: String },

    /// Virtual file name is not a plain file name.
    #[error("Invalid virtual file name: {name:?}")]
    InvalidFileName { name: String },

    /// Virtual file does not exist.
    #[error("Virtual file not found: {name}")]
    FileNotFound { name: String },

    /// The engine ran but reported failure.
    #[error("Engine execution failed: {reason}")]
    ExecFailed { code: Option<i32>, reason: String },

    /// I/O error talking to the engine.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Creates a new exec failure.
    pub fn exec_failed(code: Option<i32>, reason: impl Into<String>) -> Self {
        Self::ExecFailed {
            code,
            reason: reason.into(),
        }
    }

    /// Creates a new load failure.
    pub fn load_failed(reason: impl Into<String>) -> Self {
        Self::LoadFailed {
            reason: reason.into(),
        }
    }

    /// Whether this error means the file was already gone.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::FileNotFound { .. } => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

//! Audio operations.
//!
//! This module provides:
//! - The typed request for every operation kind and the result handed back
//! - The failure taxonomy shared by single-file and batch execution
//! - [`OperationExecutor`], which runs one request end to end: validate,
//!   write inputs, execute, read the output back, clean up
//!
//! # Example
//!
//! ```ignore
//! use audiokit_core::operation::{OperationExecutor, OperationRequest, SourceFile};
//!
//! let executor = OperationExecutor::new(manager);
//! let cover = executor
//!     .run(&SourceFile::new("song.mp3", bytes), &OperationRequest::ExtractCover, None)
//!     .await?;
//! println!("{} ({})", cover.filename, cover.mime_type);
//! ```

mod error;
mod executor;
mod types;

pub use error::{ErrorCategory, OperationError};
pub use executor::{OperationExecutor, DEFAULT_LOG_TAIL_LINES};
pub use types::{
    ConvertRequest, NoiseColor, NoiseRequest, OperationKind, OperationOutput, OperationRequest,
    OperationResult, RetagRequest, SourceFile, TagSet, TrimRequest, WaveformRequest,
};

//! Batch processing.
//!
//! Files run strictly one after another through the shared engine. Overall
//! progress weights every file equally, output names are made unique within
//! the batch, and every produced file is also packed into a zip archive.

mod archive;
mod error;
mod naming;
mod orchestrator;

pub use archive::{build_archive, ARCHIVE_MIME};
pub use error::{BatchError, BatchItemFailure};
pub use naming::UniqueNames;
pub use orchestrator::{BatchOrchestrator, BatchResult};

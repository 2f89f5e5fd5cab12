//! Sequential batch execution.

use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use super::archive::{build_archive, ARCHIVE_MIME};
use super::error::{BatchError, BatchItemFailure};
use super::naming::UniqueNames;
use crate::metrics::BATCH_ITEMS;
use crate::operation::{OperationError, OperationExecutor, OperationRequest, OperationResult, SourceFile};
use crate::progress::{ProgressCallback, ProgressEvent, ProgressTranslator};

/// Outcome of a batch with at least one produced file.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    /// Zip of every item.
    pub archive: OperationResult,
    /// Produced files in input order, with batch-unique names.
    pub items: Vec<OperationResult>,
    /// Files that failed.
    pub failures: Vec<BatchItemFailure>,
    /// Files skipped because they had nothing to extract.
    pub skipped: Vec<String>,
}

/// Runs one operation over many files, one after another.
///
/// A failed file does not stop the batch unless the failure is
/// unrecoverable; files without a cover are skipped rather than failed. The
/// batch fails only when nothing was produced.
#[derive(Clone)]
pub struct BatchOrchestrator {
    executor: OperationExecutor,
}

impl BatchOrchestrator {
    /// Creates an orchestrator over `executor`.
    pub fn new(executor: OperationExecutor) -> Self {
        Self { executor }
    }

    /// Runs `request` over `files` in order.
    ///
    /// `progress` receives the overall percentage, weighting every file
    /// equally: `round((index + file_fraction) / total * 100)`.
    pub async fn run(
        &self,
        files: &[SourceFile],
        request: &OperationRequest,
        progress: Option<ProgressCallback>,
    ) -> Result<BatchResult, BatchError> {
        let kind = request.kind();
        if !kind.produces_file() {
            return Err(BatchError::Unsupported(kind));
        }
        if files.is_empty() {
            return Err(BatchError::Empty);
        }

        let total = files.len();
        let overall = Arc::new(Mutex::new(ProgressTranslator::new(progress)));
        let mut names = UniqueNames::new();
        let mut items = Vec::new();
        let mut failures = Vec::new();
        let mut skipped = Vec::new();

        info!(operation = %kind, files = total, "Starting batch");

        for (index, file) in files.iter().enumerate() {
            let callback = file_progress(Arc::clone(&overall), index, total);

            match self.executor.run(file, request, Some(callback)).await {
                Ok(mut result) => {
                    result.filename = names.claim(&result.filename);
                    BATCH_ITEMS.with_label_values(&["success"]).inc();
                    items.push(result);
                }
                Err(OperationError::NoCover { .. }) => {
                    BATCH_ITEMS.with_label_values(&["skipped"]).inc();
                    warn!(file = %file.name, "No cover art, skipping");
                    skipped.push(file.name.clone());
                }
                Err(e) if !e.is_recoverable() => {
                    BATCH_ITEMS.with_label_values(&["failed"]).inc();
                    return Err(BatchError::Aborted {
                        file: file.name.clone(),
                        source: e,
                    });
                }
                Err(e) => {
                    BATCH_ITEMS.with_label_values(&["failed"]).inc();
                    warn!(file = %file.name, error = %e, "Batch item failed, continuing");
                    failures.push(BatchItemFailure {
                        file: file.name.clone(),
                        category: e.category(),
                        message: e.to_string(),
                    });
                }
            }

            observe(&overall, (index + 1) as f64 / total as f64);
        }

        if items.is_empty() {
            return Err(BatchError::NoResults { failures, skipped });
        }

        let archive = OperationResult {
            bytes: build_archive(&items)?,
            filename: format!("{}_results.zip", kind.label()),
            mime_type: ARCHIVE_MIME.to_string(),
        };

        if let Ok(mut translator) = overall.lock() {
            translator.complete();
        }

        info!(
            operation = %kind,
            produced = items.len(),
            failed = failures.len(),
            skipped = skipped.len(),
            "Batch complete"
        );

        Ok(BatchResult {
            archive,
            items,
            failures,
            skipped,
        })
    }
}

fn observe(overall: &Mutex<ProgressTranslator>, raw: f64) {
    if let Ok(mut translator) = overall.lock() {
        translator.observe(raw);
    }
}

/// Folds one file's percentage into the overall batch progress.
fn file_progress(
    overall: Arc<Mutex<ProgressTranslator>>,
    index: usize,
    total: usize,
) -> ProgressCallback {
    Arc::new(move |event: ProgressEvent| {
        let fraction = f64::from(event.percent) / 100.0;
        observe(&overall, (index as f64 + fraction) / total as f64);
    })
}

//! Single-file operation execution.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::error::OperationError;
use super::types::{
    OperationKind, OperationOutput, OperationRequest, OperationResult, SourceFile, TagSet,
};
use crate::command::{
    build_command, build_extract_cover, indicates_missing_cover, is_passthrough, parse_ffmetadata,
    CommandScope, EngineCommand,
};
use crate::engine::{EngineLease, EngineManager};
use crate::format::AudioFormat;
use crate::metrics::{OPERATIONS_TOTAL, OPERATION_DURATION};
use crate::progress::{exec_with_progress, LogTail, ProgressCallback, ProgressTranslator};

/// Default number of engine log lines attached to execution failures.
pub const DEFAULT_LOG_TAIL_LINES: usize = 8;

/// Runs one operation end to end against the shared engine.
///
/// Every operation holds the engine lease from its first write to its last
/// delete, and removes every virtual file it created on every exit path.
#[derive(Clone)]
pub struct OperationExecutor {
    manager: Arc<EngineManager>,
    log_tail_lines: usize,
}

impl OperationExecutor {
    /// Creates an executor over `manager`.
    pub fn new(manager: Arc<EngineManager>) -> Self {
        Self {
            manager,
            log_tail_lines: DEFAULT_LOG_TAIL_LINES,
        }
    }

    /// Sets how many engine log lines execution failures carry.
    pub fn with_log_tail_lines(mut self, lines: usize) -> Self {
        self.log_tail_lines = lines;
        self
    }

    /// The engine manager.
    pub fn manager(&self) -> &Arc<EngineManager> {
        &self.manager
    }

    /// Runs any operation.
    pub async fn execute(
        &self,
        source: &SourceFile,
        request: &OperationRequest,
        progress: Option<ProgressCallback>,
    ) -> Result<OperationOutput, OperationError> {
        let kind = request.kind();
        let started = Instant::now();
        debug!(operation = %kind, file = %source.name, bytes = source.bytes.len(), "Starting operation");

        let result = self.execute_inner(source, request, progress).await;

        OPERATION_DURATION
            .with_label_values(&[kind.label()])
            .observe(started.elapsed().as_secs_f64());
        match &result {
            Ok(_) => {
                OPERATIONS_TOTAL
                    .with_label_values(&[kind.label(), "success"])
                    .inc();
                info!(operation = %kind, file = %source.name, elapsed_ms = started.elapsed().as_millis() as u64, "Operation complete");
            }
            Err(e) => {
                OPERATIONS_TOTAL
                    .with_label_values(&[kind.label(), e.category().label()])
                    .inc();
                warn!(operation = %kind, file = %source.name, category = %e.category(), error = %e, "Operation failed");
            }
        }

        result
    }

    /// Runs a file-producing operation.
    pub async fn run(
        &self,
        source: &SourceFile,
        request: &OperationRequest,
        progress: Option<ProgressCallback>,
    ) -> Result<OperationResult, OperationError> {
        let kind = request.kind();
        if !kind.produces_file() {
            return Err(OperationError::invariant(format!(
                "{} does not produce a file",
                kind
            )));
        }

        match self.execute(source, request, progress).await? {
            OperationOutput::File(result) => Ok(result),
            OperationOutput::Metadata(_) => Err(OperationError::invariant(format!(
                "{} does not produce a file",
                request.kind()
            ))),
        }
    }

    /// Reads the canonical tag set of a file.
    pub async fn read_metadata(
        &self,
        source: &SourceFile,
        progress: Option<ProgressCallback>,
    ) -> Result<TagSet, OperationError> {
        match self
            .execute(source, &OperationRequest::ReadMetadata, progress)
            .await?
        {
            OperationOutput::Metadata(tags) => Ok(tags),
            OperationOutput::File(_) => Err(OperationError::invariant(
                "metadata export produced a file result",
            )),
        }
    }

    async fn execute_inner(
        &self,
        source: &SourceFile,
        request: &OperationRequest,
        progress: Option<ProgressCallback>,
    ) -> Result<OperationOutput, OperationError> {
        let kind = request.kind();
        let scope = CommandScope::unique();

        // Validate before the engine is loaded or touched.
        build_command(source, request, None, &scope)?;

        let lease = self.manager.acquire().await?;

        let discovered = if needs_cover_discovery(source, request) {
            self.discover_cover(&lease, source).await
        } else {
            None
        };

        let command = build_command(source, request, discovered.as_deref(), &scope)?;
        let mut translator = ProgressTranslator::new(progress);
        let bytes = self
            .run_command(&lease, &command, kind, source, &mut translator)
            .await?;

        let output = if kind == OperationKind::ReadMetadata {
            OperationOutput::Metadata(parse_ffmetadata(&String::from_utf8_lossy(&bytes)))
        } else {
            let (filename, mime_type) = command.naming.resolve(&bytes);
            OperationOutput::File(OperationResult {
                bytes,
                filename,
                mime_type,
            })
        };

        translator.complete();
        Ok(output)
    }

    /// Writes inputs, runs the command and reads the output back, then
    /// deletes every virtual file regardless of the outcome.
    async fn run_command(
        &self,
        lease: &EngineLease,
        command: &EngineCommand<'_>,
        kind: OperationKind,
        source: &SourceFile,
        translator: &mut ProgressTranslator,
    ) -> Result<Vec<u8>, OperationError> {
        let mut log = LogTail::new(self.log_tail_lines);
        let result = Self::run_steps(lease, command, kind, source, translator, &mut log).await;

        for name in command.virtual_names() {
            lease.delete(&name).await;
        }

        result
    }

    async fn run_steps(
        lease: &EngineLease,
        command: &EngineCommand<'_>,
        kind: OperationKind,
        source: &SourceFile,
        translator: &mut ProgressTranslator,
        log: &mut LogTail,
    ) -> Result<Vec<u8>, OperationError> {
        let expects_cover = kind == OperationKind::ExtractCover;

        for input in &command.inputs {
            lease.write(&input.name, input.bytes).await?;
        }

        if let Err(e) = exec_with_progress(lease, &command.args, translator, log).await {
            if expects_cover && indicates_missing_cover(log) {
                return Err(OperationError::no_cover(&source.name));
            }
            return Err(OperationError::execution(e.to_string(), log.lines()));
        }

        let bytes = match lease.read(&command.output).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() && expects_cover => {
                return Err(OperationError::no_cover(&source.name));
            }
            Err(e) if e.is_not_found() => {
                return Err(OperationError::execution(
                    "engine produced no output file",
                    log.lines(),
                ));
            }
            Err(e) => return Err(OperationError::execution(e.to_string(), log.lines())),
        };

        if bytes.is_empty() {
            if expects_cover {
                return Err(OperationError::no_cover(&source.name));
            }
            return Err(OperationError::execution(
                "engine produced an empty output file",
                log.lines(),
            ));
        }

        Ok(bytes)
    }

    /// Extracts the source's cover, if it has one. Absence is not an error.
    async fn discover_cover(&self, lease: &EngineLease, source: &SourceFile) -> Option<Vec<u8>> {
        let command = build_extract_cover(source, &CommandScope::unique());
        let mut silent = ProgressTranslator::new(None);
        match self
            .run_command(
                lease,
                &command,
                OperationKind::ExtractCover,
                source,
                &mut silent,
            )
            .await
        {
            Ok(bytes) => {
                debug!(file = %source.name, bytes = bytes.len(), "Discovered source cover");
                Some(bytes)
            }
            Err(OperationError::NoCover { .. }) => None,
            Err(e) => {
                warn!(file = %source.name, error = %e, "Cover discovery failed, continuing without cover");
                None
            }
        }
    }
}

/// Whether the request embeds a picture comment that must come from the
/// source's existing cover.
fn needs_cover_discovery(source: &SourceFile, request: &OperationRequest) -> bool {
    match request {
        OperationRequest::ConvertFormat(convert) => convert.format == AudioFormat::Ogg,
        OperationRequest::RetagAudio(retag) => {
            source.format() == Some(AudioFormat::Ogg)
                && retag.cover.as_ref().map_or(true, |cover| cover.is_empty())
        }
        OperationRequest::TrimAudio(trim) => {
            source.format() == Some(AudioFormat::Ogg) && is_passthrough(source.format(), trim)
        }
        _ => false,
    }
}

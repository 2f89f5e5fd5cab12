//! Trait definitions for the engine module.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::capabilities::{EngineBuild, HostFeatures};
use super::error::EngineError;

/// Event emitted by the engine while a command runs.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Raw progress fraction, nominally `0.0..=1.0`. Not guaranteed monotonic.
    Progress(f64),
    /// One diagnostic log line.
    Log(String),
}

/// A loaded transcoding engine with a private virtual filesystem.
///
/// Implementations are not expected to handle concurrent `exec` calls;
/// [`EngineManager`](super::EngineManager) serializes access.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Which build of the engine is running.
    fn build(&self) -> EngineBuild;

    /// Stores `bytes` as a virtual file.
    async fn write(&self, name: &str, bytes: &[u8]) -> Result<(), EngineError>;

    /// Runs one command to completion.
    ///
    /// Progress and log events are sent on `events` while the command runs.
    /// A closed receiver does not abort the command.
    async fn exec(
        &self,
        args: &[String],
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Result<(), EngineError>;

    /// Reads a virtual file.
    async fn read(&self, name: &str) -> Result<Vec<u8>, EngineError>;

    /// Removes a virtual file.
    async fn delete(&self, name: &str) -> Result<(), EngineError>;

    /// Releases engine resources. Called once when the engine is discarded.
    async fn shutdown(&self) {}
}

/// Loads engine instances.
#[async_trait]
pub trait EngineLoader: Send + Sync {
    /// Reports the host features relevant to build selection.
    async fn probe(&self) -> HostFeatures;

    /// Loads the given build.
    async fn load(&self, build: EngineBuild) -> Result<Arc<dyn Engine>, EngineError>;
}

use std::sync::Arc;
use audiokit_core::{
    BatchOrchestrator, Config, EngineManager, OperationDefaults, OperationExecutor,
    SanitizedConfig,
};

/// Shared application state
pub struct AppState {
    config: Config,
    executor: OperationExecutor,
    batch: BatchOrchestrator,
}

impl AppState {
    /// Wires the executor and batch orchestrator around one engine manager.
    pub fn new(config: Config, manager: Arc<EngineManager>) -> Self {
        let executor =
            OperationExecutor::new(manager).with_log_tail_lines(config.engine.log_tail_lines);
        let batch = BatchOrchestrator::new(executor.clone());
        Self {
            config,
            executor,
            batch,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn defaults(&self) -> &OperationDefaults {
        &self.config.defaults
    }

    pub fn executor(&self) -> &OperationExecutor {
        &self.executor
    }

    pub fn batch(&self) -> &BatchOrchestrator {
        &self.batch
    }

    pub fn manager(&self) -> &Arc<EngineManager> {
        self.executor.manager()
    }

    /// Request body limit in bytes.
    pub fn body_limit(&self) -> usize {
        usize::try_from(self.config.server.max_upload_mb.saturating_mul(1024 * 1024))
            .unwrap_or(usize::MAX)
    }
}

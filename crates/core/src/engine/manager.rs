//! Engine lifecycle: single-flight loading and serialized access.

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use super::capabilities::{select_build, EngineBuild};
use super::error::EngineError;
use super::traits::{Engine, EngineEvent, EngineLoader};
use crate::metrics::ENGINE_LOADS;

type LoadFuture = Shared<BoxFuture<'static, Result<Arc<dyn Engine>, Arc<EngineError>>>>;

enum LoadState {
    Unloaded,
    Loading { attempt: u64, future: LoadFuture },
    Loaded(Arc<dyn Engine>),
}

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EngineStatus {
    Unloaded,
    Loading,
    Loaded { build: EngineBuild },
}

/// Owns the one engine instance shared by every operation.
///
/// Loading is single-flight: concurrent callers during a load await the same
/// attempt. A failed attempt returns the manager to `Unloaded` so the next
/// call retries.
pub struct EngineManager {
    loader: Arc<dyn EngineLoader>,
    state: Mutex<LoadState>,
    access: Arc<Mutex<()>>,
    attempts: AtomicU64,
}

impl EngineManager {
    /// Creates an unloaded manager.
    pub fn new(loader: Arc<dyn EngineLoader>) -> Self {
        Self {
            loader,
            state: Mutex::new(LoadState::Unloaded),
            access: Arc::new(Mutex::new(())),
            attempts: AtomicU64::new(0),
        }
    }

    /// Current lifecycle state.
    pub async fn status(&self) -> EngineStatus {
        match &*self.state.lock().await {
            LoadState::Unloaded => EngineStatus::Unloaded,
            LoadState::Loading { .. } => EngineStatus::Loading,
            LoadState::Loaded(engine) => EngineStatus::Loaded {
                build: engine.build(),
            },
        }
    }

    /// Returns the loaded engine, loading it if needed.
    pub async fn ensure_loaded(&self) -> Result<Arc<dyn Engine>, EngineError> {
        let (attempt, future) = {
            let mut state = self.state.lock().await;
            match &*state {
                LoadState::Loaded(engine) => return Ok(Arc::clone(engine)),
                LoadState::Loading { attempt, future } => (*attempt, future.clone()),
                LoadState::Unloaded => {
                    let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
                    let future = Self::load_future(Arc::clone(&self.loader), attempt);
                    *state = LoadState::Loading {
                        attempt,
                        future: future.clone(),
                    };
                    (attempt, future)
                }
            }
        };

        let result = future.await;

        let mut state = self.state.lock().await;
        let is_current =
            matches!(&*state, LoadState::Loading { attempt: current, .. } if *current == attempt);

        match result {
            Ok(engine) => {
                if is_current {
                    *state = LoadState::Loaded(Arc::clone(&engine));
                }
                Ok(engine)
            }
            Err(e) => {
                if is_current {
                    *state = LoadState::Unloaded;
                }
                Err(EngineError::Unavailable {
                    reason: e.to_string(),
                })
            }
        }
    }

    fn load_future(loader: Arc<dyn EngineLoader>, attempt: u64) -> LoadFuture {
        async move {
            let features = loader.probe().await;
            let build = select_build(&features);
            let missing = features.missing_features();
            if missing.is_empty() {
                info!(attempt, %build, "Loading engine");
            } else {
                info!(attempt, %build, ?missing, "Loading engine (fallback build)");
            }

            match loader.load(build).await {
                Ok(engine) => {
                    ENGINE_LOADS
                        .with_label_values(&[build.label(), "success"])
                        .inc();
                    info!(attempt, %build, "Engine loaded");
                    Ok(engine)
                }
                Err(e) => {
                    ENGINE_LOADS
                        .with_label_values(&[build.label(), "error"])
                        .inc();
                    warn!(attempt, %build, error = %e, "Engine load failed");
                    Err(Arc::new(e))
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Loads the engine and waits for exclusive use of it.
    pub async fn acquire(&self) -> Result<EngineLease, EngineError> {
        let engine = self.ensure_loaded().await?;
        let guard = Arc::clone(&self.access).lock_owned().await;
        Ok(EngineLease {
            engine,
            _guard: guard,
        })
    }

    /// Discards the loaded engine, if any.
    pub async fn shutdown(&self) {
        let previous = std::mem::replace(&mut *self.state.lock().await, LoadState::Unloaded);
        if let LoadState::Loaded(engine) = previous {
            let _guard = self.access.lock().await;
            engine.shutdown().await;
            info!("Engine shut down");
        }
    }
}

/// Exclusive access to the engine for the duration of one operation.
pub struct EngineLease {
    engine: Arc<dyn Engine>,
    _guard: OwnedMutexGuard<()>,
}

impl EngineLease {
    /// Build of the leased engine.
    pub fn build(&self) -> EngineBuild {
        self.engine.build()
    }

    /// Writes a virtual file.
    pub async fn write(&self, name: &str, bytes: &[u8]) -> Result<(), EngineError> {
        debug!(name, bytes = bytes.len(), "Writing virtual file");
        self.engine.write(name, bytes).await
    }

    /// Runs one engine command.
    pub async fn exec(
        &self,
        args: &[String],
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Result<(), EngineError> {
        debug!(?args, "Executing engine command");
        self.engine.exec(args, events).await
    }

    /// Reads a virtual file.
    pub async fn read(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        self.engine.read(name).await
    }

    /// Deletes a virtual file, ignoring errors.
    ///
    /// Missing files are expected after partial failures; other errors are
    /// logged.
    pub async fn delete(&self, name: &str) {
        match self.engine.delete(name).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => warn!(name, error = %e, "Failed to delete virtual file"),
        }
    }
}

//! Mock engine and loader for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::engine::{Engine, EngineBuild, EngineError, EngineEvent, EngineLoader, HostFeatures};

/// Files held by a [`MockEngine`], by virtual name.
pub type MockFs = HashMap<String, Vec<u8>>;

/// Scripted command behaviour.
///
/// Receives the argument vector (without any engine prefix) and the virtual
/// filesystem, and may read inputs and write outputs.
pub type ExecHandler =
    Arc<dyn Fn(&[String], &mut MockFs) -> Result<(), EngineError> + Send + Sync>;

struct MockState {
    files: Mutex<MockFs>,
    executions: Mutex<Vec<Vec<String>>>,
    deleted: Mutex<Vec<String>>,
    handler: Mutex<Option<ExecHandler>>,
    events: Mutex<Vec<EngineEvent>>,
    output: Mutex<Vec<u8>>,
    next_errors: Mutex<Vec<EngineError>>,
}

/// Mock implementation of the Engine trait.
///
/// Provides controllable behavior for testing:
/// - In-memory virtual filesystem shared by every clone
/// - Recorded argument vectors for assertions
/// - Scripted events and failures per command
///
/// Without a handler, each command writes the configured output bytes to the
/// file named by its last argument.
///
/// # Example
///
/// ```rust,ignore
/// use audiokit_core::testing::MockEngine;
///
/// let engine = MockEngine::new();
/// engine.set_events(vec![EngineEvent::Progress(0.5)]);
/// engine.set_output(b"encoded".to_vec());
///
/// // run an operation...
///
/// assert_eq!(engine.executions().len(), 1);
/// assert!(engine.file_names().is_empty());
/// ```
#[derive(Clone)]
pub struct MockEngine {
    state: Arc<MockState>,
    build: EngineBuild,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    /// Create a new mock engine.
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockState {
                files: Mutex::new(HashMap::new()),
                executions: Mutex::new(Vec::new()),
                deleted: Mutex::new(Vec::new()),
                handler: Mutex::new(None),
                events: Mutex::new(Vec::new()),
                output: Mutex::new(b"mock-output".to_vec()),
                next_errors: Mutex::new(Vec::new()),
            }),
            build: EngineBuild::MultiThreaded,
        }
    }

    /// A handle sharing this engine's state but reporting `build`.
    pub fn with_build(&self, build: EngineBuild) -> Self {
        Self {
            state: Arc::clone(&self.state),
            build,
        }
    }

    /// Script every command through `handler`.
    pub fn set_handler<F>(&self, handler: F)
    where
        F: Fn(&[String], &mut MockFs) -> Result<(), EngineError> + Send + Sync + 'static,
    {
        *self.state.handler.lock().unwrap() = Some(Arc::new(handler));
    }

    /// Events emitted at the start of every command.
    pub fn set_events(&self, events: Vec<EngineEvent>) {
        *self.state.events.lock().unwrap() = events;
    }

    /// Bytes written by the default handler.
    pub fn set_output(&self, bytes: Vec<u8>) {
        *self.state.output.lock().unwrap() = bytes;
    }

    /// Fail the next command with `error` (queued, first in first out).
    pub fn fail_next_exec(&self, error: EngineError) {
        self.state.next_errors.lock().unwrap().push(error);
    }

    /// Argument vectors of every command run so far.
    pub fn executions(&self) -> Vec<Vec<String>> {
        self.state.executions.lock().unwrap().clone()
    }

    /// Argument vector of the most recent command.
    pub fn last_args(&self) -> Option<Vec<String>> {
        self.state.executions.lock().unwrap().last().cloned()
    }

    /// Names currently present in the virtual filesystem, sorted.
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.files.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    /// Names passed to `delete`, in call order.
    pub fn deleted_names(&self) -> Vec<String> {
        self.state.deleted.lock().unwrap().clone()
    }

    /// Contents of a virtual file.
    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.state.files.lock().unwrap().get(name).cloned()
    }

    /// Place a file directly into the virtual filesystem.
    pub fn insert_file(&self, name: impl Into<String>, bytes: Vec<u8>) {
        self.state.files.lock().unwrap().insert(name.into(), bytes);
    }

    fn run(&self, args: &[String]) -> Result<(), EngineError> {
        let queued = {
            let mut errors = self.state.next_errors.lock().unwrap();
            if errors.is_empty() {
                None
            } else {
                Some(errors.remove(0))
            }
        };
        if let Some(err) = queued {
            return Err(err);
        }

        let handler = self.state.handler.lock().unwrap().clone();
        let mut files = self.state.files.lock().unwrap();
        match handler {
            Some(handler) => handler(args, &mut files),
            None => {
                let output = args
                    .last()
                    .ok_or_else(|| EngineError::exec_failed(Some(1), "no output file"))?;
                let bytes = self.state.output.lock().unwrap().clone();
                files.insert(output.clone(), bytes);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Engine for MockEngine {
    fn build(&self) -> EngineBuild {
        self.build
    }

    async fn write(&self, name: &str, bytes: &[u8]) -> Result<(), EngineError> {
        self.state
            .files
            .lock()
            .unwrap()
            .insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn exec(
        &self,
        args: &[String],
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Result<(), EngineError> {
        self.state.executions.lock().unwrap().push(args.to_vec());

        let scripted = self.state.events.lock().unwrap().clone();
        for event in scripted {
            let _ = events.send(event);
        }
        tokio::task::yield_now().await;

        self.run(args)
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        self.file(name).ok_or_else(|| EngineError::FileNotFound {
            name: name.to_string(),
        })
    }

    async fn delete(&self, name: &str) -> Result<(), EngineError> {
        self.state.deleted.lock().unwrap().push(name.to_string());
        match self.state.files.lock().unwrap().remove(name) {
            Some(_) => Ok(()),
            None => Err(EngineError::FileNotFound {
                name: name.to_string(),
            }),
        }
    }
}

/// Mock implementation of the EngineLoader trait.
///
/// Every successful load hands out a handle to the same [`MockEngine`],
/// reporting the build the manager asked for.
pub struct MockEngineLoader {
    engine: MockEngine,
    features: Mutex<HostFeatures>,
    load_delay: Mutex<Duration>,
    failures_left: AtomicUsize,
    loads: AtomicUsize,
    builds: Mutex<Vec<EngineBuild>>,
}

impl MockEngineLoader {
    /// Create a loader for `engine` on a fully capable host.
    pub fn new(engine: MockEngine) -> Self {
        Self {
            engine,
            features: Mutex::new(HostFeatures {
                available_cores: 4,
                threading_allowed: true,
                engine_threads: true,
            }),
            load_delay: Mutex::new(Duration::ZERO),
            failures_left: AtomicUsize::new(0),
            loads: AtomicUsize::new(0),
            builds: Mutex::new(Vec::new()),
        }
    }

    /// The engine handed out by this loader.
    pub fn engine(&self) -> &MockEngine {
        &self.engine
    }

    /// Host features reported by `probe`.
    pub fn set_features(&self, features: HostFeatures) {
        *self.features.lock().unwrap() = features;
    }

    /// Simulated load duration.
    pub fn set_load_delay(&self, delay: Duration) {
        *self.load_delay.lock().unwrap() = delay;
    }

    /// Make the next `count` loads fail.
    pub fn fail_next_loads(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// Number of load attempts so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Builds requested so far, in order.
    pub fn requested_builds(&self) -> Vec<EngineBuild> {
        self.builds.lock().unwrap().clone()
    }
}

#[async_trait]
impl EngineLoader for MockEngineLoader {
    async fn probe(&self) -> HostFeatures {
        self.features.lock().unwrap().clone()
    }

    async fn load(&self, build: EngineBuild) -> Result<Arc<dyn Engine>, EngineError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.builds.lock().unwrap().push(build);

        let delay = *self.load_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(EngineError::load_failed("mock load failure"));
        }

        Ok(Arc::new(self.engine.with_build(build)))
    }
}

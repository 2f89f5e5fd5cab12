pub mod batch;
pub mod command;
pub mod config;
pub mod engine;
pub mod format;
pub mod metrics;
pub mod operation;
pub mod picture;
pub mod progress;
pub mod testing;

pub use batch::{BatchError, BatchItemFailure, BatchOrchestrator, BatchResult};
pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, OperationDefaults, SanitizedConfig, ServerConfig,
};
pub use engine::{
    EngineBuild, EngineConfig, EngineError, EngineManager, EngineStatus, FfmpegLoader,
};
pub use format::{AudioFormat, Bitrate, ChannelSelection, FormatDescriptor, FormatError};
pub use operation::{
    ErrorCategory, OperationError, OperationExecutor, OperationKind, OperationOutput,
    OperationRequest, OperationResult, SourceFile, TagSet,
};
pub use progress::{ProgressCallback, ProgressEvent};

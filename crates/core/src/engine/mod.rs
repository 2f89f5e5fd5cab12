//! Transcoding engine contract and lifecycle.
//!
//! The engine is an external program driven through a tiny contract: write
//! input bytes into its virtual filesystem, execute an argument vector, read
//! output bytes back, delete what was written. [`EngineManager`] owns the one
//! shared instance: it loads it lazily (coalescing concurrent first use into
//! a single attempt), chooses between the multi-threaded and baseline builds
//! from a host probe, and hands out exclusive [`EngineLease`]s so commands
//! never overlap.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use audiokit_core::engine::{EngineConfig, EngineManager, FfmpegLoader};
//!
//! let manager = EngineManager::new(Arc::new(FfmpegLoader::new(EngineConfig::default())));
//! let lease = manager.acquire().await?;
//! lease.write("in.wav", &bytes).await?;
//! ```

mod capabilities;
mod config;
mod error;
mod ffmpeg;
mod manager;
mod traits;

pub use capabilities::{select_build, EngineBuild, HostFeatures};
pub use config::EngineConfig;
pub use error::EngineError;
pub use ffmpeg::{FfmpegEngine, FfmpegLoader};
pub use manager::{EngineLease, EngineManager, EngineStatus};
pub use traits::{Engine, EngineEvent, EngineLoader};

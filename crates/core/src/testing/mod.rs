//! Testing utilities and mock implementations.
//!
//! This module provides an in-memory engine and loader so operations,
//! batches and the HTTP surface can be exercised without an ffmpeg binary.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use audiokit_core::engine::EngineManager;
//! use audiokit_core::testing::{MockEngine, MockEngineLoader};
//!
//! let engine = MockEngine::new();
//! let manager = EngineManager::new(Arc::new(MockEngineLoader::new(engine.clone())));
//!
//! // Configure command behaviour
//! engine.set_output(b"encoded".to_vec());
//! ```

mod mock_engine;

pub use mock_engine::{ExecHandler, MockEngine, MockEngineLoader, MockFs};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::operation::SourceFile;

    /// Smallest byte string recognised as a PNG.
    pub fn png_bytes() -> Vec<u8> {
        vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D]
    }

    /// Smallest byte string recognised as a JPEG.
    pub fn jpeg_bytes() -> Vec<u8> {
        vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F']
    }

    /// A source file with placeholder audio content.
    pub fn audio_file(name: &str) -> SourceFile {
        SourceFile::new(name, format!("audio:{}", name).into_bytes())
    }

    /// Value following `flag` in an argument vector.
    pub fn arg_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|arg| arg == flag)
            .and_then(|index| args.get(index + 1))
            .map(String::as_str)
    }

    /// Every value following `flag` in an argument vector.
    pub fn args_after<'a>(args: &'a [String], flag: &str) -> Vec<&'a str> {
        args.windows(2)
            .filter(|pair| pair[0] == flag)
            .map(|pair| pair[1].as_str())
            .collect()
    }
}

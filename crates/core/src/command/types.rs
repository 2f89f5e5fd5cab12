//! Types for the command module.

use std::fmt;

use crate::operation::SourceFile;
use crate::picture::{detect_image_mime, image_extension};

/// One file written into the engine before a command runs.
#[derive(Clone, PartialEq, Eq)]
pub struct VirtualFile<'a> {
    pub name: String,
    pub bytes: &'a [u8],
}

impl fmt::Debug for VirtualFile<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualFile")
            .field("name", &self.name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// How the produced file is named for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultNaming {
    /// Name and MIME type are known up front.
    Fixed { filename: String, mime_type: String },
    /// An image whose type is only known after reading it back.
    DetectedImage { stem: String },
}

impl ResultNaming {
    /// Fixed naming.
    pub fn fixed(filename: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::Fixed {
            filename: filename.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Resolves the final filename and MIME type for `bytes`.
    pub fn resolve(&self, bytes: &[u8]) -> (String, String) {
        match self {
            Self::Fixed {
                filename,
                mime_type,
            } => (filename.clone(), mime_type.clone()),
            Self::DetectedImage { stem } => {
                let mime = detect_image_mime(bytes);
                (
                    format!("{}_cover.{}", stem, image_extension(mime)),
                    mime.to_string(),
                )
            }
        }
    }
}

/// A fully built engine invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineCommand<'a> {
    /// Files to write before running.
    pub inputs: Vec<VirtualFile<'a>>,
    /// Argument vector, in order.
    pub args: Vec<String>,
    /// Virtual file the engine produces.
    pub output: String,
    /// Caller-facing naming of the output.
    pub naming: ResultNaming,
}

impl EngineCommand<'_> {
    /// Every virtual name this command may leave behind.
    pub fn virtual_names(&self) -> Vec<String> {
        self.inputs
            .iter()
            .map(|input| input.name.clone())
            .chain(std::iter::once(self.output.clone()))
            .collect()
    }
}

/// Prefix making every virtual name of one invocation unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandScope {
    prefix: String,
}

impl CommandScope {
    /// A scope with an explicit prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// A scope with a random prefix.
    pub fn unique() -> Self {
        Self::new(format!("ak{}", uuid::Uuid::new_v4().simple()))
    }

    /// Scoped virtual name for `role` with extension `ext`.
    pub fn file(&self, role: &str, ext: &str) -> String {
        format!("{}-{}.{}", self.prefix, role, ext)
    }

    /// Scoped name for the source, keeping its extension so the engine can
    /// probe the container.
    pub fn input_for(&self, source: &SourceFile) -> String {
        let ext = source.extension().unwrap_or_else(|| "bin".to_string());
        self.file("input", &ext)
    }
}

/// Seconds with millisecond precision, as the engine's time syntax expects.
pub(crate) fn secs(value: f64) -> String {
    format!("{:.3}", value)
}

/// Pushes string-like items onto an argument vector.
pub(crate) fn push_all<I, S>(args: &mut Vec<String>, items: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    args.extend(items.into_iter().map(Into::into));
}

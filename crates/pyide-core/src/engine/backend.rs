//! The execution boundary.
//!
//! A backend is an opaque interpreter with a private filesystem. It receives
//! files and source text and streams output back as chunks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::Result;

/// Which output channel produced a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// A piece of program output, delivered as soon as the program produces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub stream: OutputStream,
    pub text: String,
}

impl OutputChunk {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            stream: OutputStream::Stdout,
            text: text.into(),
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self {
            stream: OutputStream::Stderr,
            text: text.into(),
        }
    }
}

/// Sending half of an output channel.
pub type OutputSender = mpsc::UnboundedSender<OutputChunk>;

/// What to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// Name of the entry file, as written into the backend filesystem.
    pub entry: String,
    /// Source text of the entry file.
    pub source: String,
}

/// How an execution ended.
///
/// A failure raised by user code is an outcome, not an error: the run is
/// complete and the engine stays usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Success,
    RuntimeError { message: String },
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// An interpreter instance with an isolated filesystem.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Short human-readable description, e.g. the interpreter version.
    fn describe(&self) -> String;

    /// Creates or overwrites a file in the backend filesystem.
    async fn write_file(&self, path: &str, content: &str) -> Result<()>;

    /// Drops interpreter state that would leak from one run into the next,
    /// such as cached imports.
    async fn reset(&self) -> Result<()>;

    /// Runs `request.source`, sending output chunks to `output` while it runs.
    ///
    /// Returns `Err` only when the backend itself fails (for example the
    /// interpreter cannot be started).
    async fn execute(
        &self,
        request: ExecutionRequest,
        output: OutputSender,
    ) -> Result<ExecutionOutcome>;
}

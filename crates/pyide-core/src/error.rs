//! Error types for the pyide workspace.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::EngineState;

/// A shared error type for the entire pyide workspace.
///
/// Project-model and engine-lifecycle failures are expected, recoverable
/// conditions: callers turn them into prompts or console messages rather
/// than aborting the session.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PyideError {
    /// A file with this name already exists in the project.
    #[error("A file named '{0}' already exists")]
    DuplicateName(String),

    /// The name cannot be used as a project file name.
    #[error("Invalid file name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// The designated default file cannot be deleted.
    #[error("'{0}' is the default file and cannot be deleted")]
    ProtectedFile(String),

    /// A named thing (usually a file) does not exist.
    #[error("No {entity_type} named '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// The engine has not finished initializing.
    #[error("Engine is not ready (state: {state})")]
    EngineNotReady { state: EngineState },

    /// The engine failed to initialize and is permanently unusable.
    #[error("Engine failed to initialize: {0}")]
    EngineFailed(String),

    /// Another execution is still running on the engine.
    #[error("Engine is busy with another execution")]
    EngineBusy,

    /// Filesystem failure, flattened to a message so the error stays `Clone`.
    #[error("I/O failure: {message}")]
    Io { message: String },

    /// A document could not be encoded or decoded.
    #[error("{format} encoding failed: {message}")]
    Serialization {
        format: String,
        message: String,
    },

    /// Unusable configuration or path setup.
    #[error("Configuration problem: {0}")]
    Config(String),

    /// The interpreter backend failed outside of user code.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Broken invariant inside pyide.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PyideError {
    /// `NotFound` for an entity of the given kind.
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_protected(&self) -> bool {
        matches!(self, Self::ProtectedFile(_))
    }

    /// True when a proposed file name was refused: taken or unusable.
    pub fn is_rejected_name(&self) -> bool {
        matches!(self, Self::DuplicateName(_) | Self::InvalidName { .. })
    }

    /// True when a run could not start because of the engine's state.
    pub fn is_engine_unavailable(&self) -> bool {
        matches!(
            self,
            Self::EngineNotReady { .. } | Self::EngineFailed(_) | Self::EngineBusy
        )
    }
}

impl From<std::io::Error> for PyideError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{err} ({:?})", err.kind()),
        }
    }
}

impl From<serde_json::Error> for PyideError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for PyideError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for PyideError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for PyideError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, PyideError>`.
pub type Result<T> = std::result::Result<T, PyideError>;

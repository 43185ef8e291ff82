//! Workspace configuration model.
//!
//! Every field has a default, so a missing or partial `config.toml` is valid.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default interval between background saves.
pub const DEFAULT_AUTOSAVE_INTERVAL_MS: u64 = 1500;

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Location of the project slot. `None` uses the platform data directory.
    pub store_path: Option<PathBuf>,
    /// Interval of the background save, in milliseconds.
    pub autosave_interval_ms: u64,
    pub interpreter: InterpreterConfig,
    pub logging: LoggingConfig,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            autosave_interval_ms: DEFAULT_AUTOSAVE_INTERVAL_MS,
            interpreter: InterpreterConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl WorkspaceConfig {
    pub fn autosave_interval(&self) -> Duration {
        Duration::from_millis(self.autosave_interval_ms.max(1))
    }
}

/// How to launch the interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Interpreter executable.
    pub program: String,
    /// Arguments placed before the entry script path.
    pub args: Vec<String>,
    /// Arguments used to probe the interpreter at startup.
    pub probe_args: Vec<String>,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec!["-u".to_string()],
            probe_args: vec!["--version".to_string()],
        }
    }
}

/// Diagnostic logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    pub level: String,
    /// Log directory. `None` uses the platform data directory.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

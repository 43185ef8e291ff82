//! Unified path management for pyide files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/pyide/             # Config directory
//! └── config.toml              # Workspace configuration
//!
//! ~/.local/share/pyide/        # Data directory
//! ├── project.json             # The durable project slot
//! └── logs/                    # Diagnostic logs
//!     └── pyide.log.YYYY-MM-DD
//! ```
//!
//! A base override places both directories under one root, which keeps tests
//! and portable installs away from the user's real home.

use std::path::PathBuf;

const APP_DIR: &str = "pyide";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for pyide_core::PyideError {
    fn from(err: PathError) -> Self {
        pyide_core::PyideError::config(err.to_string())
    }
}

/// Resolves where pyide keeps its files.
#[derive(Debug, Clone, Default)]
pub struct PyidePaths {
    base: Option<PathBuf>,
}

impl PyidePaths {
    /// Creates a resolver. `base` replaces the platform directories when set.
    pub fn new(base: Option<PathBuf>) -> Self {
        Self { base }
    }

    /// Returns the pyide configuration directory (e.g. `~/.config/pyide/`).
    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base {
            Some(base) => Ok(base.join("config")),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or(PathError::HomeDirNotFound),
        }
    }

    /// Returns the pyide data directory (e.g. `~/.local/share/pyide/`).
    pub fn data_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base {
            Some(base) => Ok(base.join("data")),
            None => dirs::data_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or(PathError::HomeDirNotFound),
        }
    }

    /// Returns the path to `config.toml`.
    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// Returns the path to the durable project slot.
    pub fn project_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join("project.json"))
    }

    /// Returns the path to the logs directory.
    pub fn logs_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join("logs"))
    }
}

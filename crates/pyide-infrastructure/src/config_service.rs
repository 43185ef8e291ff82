//! Configuration service implementation.
//!
//! Loads the workspace configuration from `config.toml` and caches it.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use pyide_core::config::WorkspaceConfig;
use pyide_core::error::Result;

use crate::paths::PyidePaths;
use crate::storage::{AtomicFile, FileFormat};

/// Configuration service that loads and caches the workspace configuration.
///
/// A missing or unreadable file yields the default configuration; pyide
/// never refuses to start over its config.
#[derive(Clone)]
pub struct ConfigService {
    file: Arc<AtomicFile<WorkspaceConfig>>,
    /// Cached configuration. Uses RwLock for thread-safe lazy loading.
    config: Arc<RwLock<Option<WorkspaceConfig>>>,
}

impl ConfigService {
    /// Creates a service reading from the default location.
    pub fn new() -> Result<Self> {
        let path = PyidePaths::new(None).config_file()?;
        Ok(Self::with_path(path))
    }

    /// Creates a service reading from `path`.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            file: Arc::new(AtomicFile::new(path, FileFormat::Toml)),
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }

    /// Gets the configuration, loading from file if not cached.
    pub fn get_config(&self) -> WorkspaceConfig {
        // Check if already cached
        {
            let read_lock = self.config.read().unwrap_or_else(|e| e.into_inner());
            if let Some(ref cached) = *read_lock {
                return cached.clone();
            }
        }

        let loaded = self.load_config();

        // Cache it
        {
            let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
            *write_lock = Some(loaded.clone());
        }

        loaded
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = None;
    }

    /// Writes the default configuration if no config file exists yet.
    ///
    /// Returns `true` when a file was created.
    pub fn init_default(&self) -> Result<bool> {
        if self.file.path().exists() {
            return Ok(false);
        }
        self.file.replace(&WorkspaceConfig::default())?;
        self.invalidate_cache();
        Ok(true)
    }

    fn load_config(&self) -> WorkspaceConfig {
        match self.file.load() {
            Ok(Some(config)) => config,
            Ok(None) => WorkspaceConfig::default(),
            Err(e) => {
                tracing::warn!(
                    "[Config] Failed to read {:?} ({}), using defaults",
                    self.file.path(),
                    e
                );
                WorkspaceConfig::default()
            }
        }
    }
}

//! JSON file implementation of the project store.
//!
//! The slot is a single JSON object `{ "<filename>": "<content>" }`, written
//! with [`AtomicFile`] so a crash mid-save never leaves a truncated document.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use pyide_core::error::{PyideError, Result};
use pyide_core::project::{
    Project, ProjectFiles, ProjectSnapshot, ProjectStore, validate_file_name,
};

use crate::paths::PyidePaths;
use crate::storage::{AtomicFile, FileFormat};

/// Project store backed by one JSON file.
#[derive(Clone)]
pub struct JsonFileProjectStore {
    file: Arc<AtomicFile<ProjectFiles>>,
}

impl JsonFileProjectStore {
    /// Creates a store at the default location (`<data_dir>/pyide/project.json`).
    pub fn new() -> Result<Self> {
        let path = PyidePaths::new(None).project_file()?;
        Ok(Self::with_path(path))
    }

    /// Creates a store at a specific path.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            file: Arc::new(AtomicFile::new(path, FileFormat::Json)),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }
}

#[async_trait]
impl ProjectStore for JsonFileProjectStore {
    async fn load(&self) -> Project {
        let file = self.file.clone();
        let loaded = tokio::task::spawn_blocking(move || file.load()).await;

        match loaded {
            Ok(Ok(Some(files))) => {
                let unusable = files
                    .keys()
                    .filter(|name| validate_file_name(name).is_err())
                    .count();
                if unusable > 0 {
                    tracing::warn!(
                        "[Store] Ignoring {} file(s) with unusable names in {:?}",
                        unusable,
                        self.file.path()
                    );
                }
                match Project::from_files(files) {
                    Some(project) => {
                        tracing::debug!("[Store] Loaded {} file(s) from {:?}", project.len(), self.file.path());
                        project
                    }
                    None => {
                        tracing::warn!(
                            "[Store] Project slot {:?} has no usable files, using default project",
                            self.file.path()
                        );
                        Project::default()
                    }
                }
            }
            Ok(Ok(None)) => {
                tracing::info!("[Store] No project at {:?}, using default project", self.file.path());
                Project::default()
            }
            Ok(Err(e)) => {
                tracing::warn!("[Store] Project slot {:?} is unreadable ({}), using default project", self.file.path(), e);
                Project::default()
            }
            Err(e) => {
                tracing::error!("[Store] Load task failed: {}", e);
                Project::default()
            }
        }
    }

    async fn save(&self, snapshot: &ProjectSnapshot) -> Result<()> {
        let file = self.file.clone();
        let files = snapshot.files().clone();
        tokio::task::spawn_blocking(move || file.replace(&files))
            .await
            .map_err(|e| PyideError::internal(format!("Failed to join save task: {}", e)))??;
        tracing::debug!("[Store] Saved {} file(s)", snapshot.files().len());
        Ok(())
    }
}

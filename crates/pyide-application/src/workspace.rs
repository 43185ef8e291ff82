//! The editing workspace: project model, editor buffer and persistence.
//!
//! Edits land in an editor buffer first. A flush commits the buffer into the
//! active file and saves a snapshot of the whole project. Flushes happen
//! explicitly (before a run, on file switches and file operations) and
//! periodically from the autosave task.
//!
//! # Flush ordering
//!
//! Store writes are serialized through a write turn, and a flush captures its
//! snapshot only once it holds that turn. Snapshots therefore reach the store
//! in capture order and each one carries every edit made before its write
//! began. A flush queued behind a slow write never saves stale content, so an
//! explicit flush always beats a periodic flush that started earlier.

use std::sync::Arc;

use pyide_core::error::{PyideError, Result};
use pyide_core::project::{
    DEFAULT_FILE_NAME, Project, ProjectSnapshot, ProjectStore, validate_file_name,
};
use pyide_core::prompt::Prompter;
use tokio::sync::Mutex;

/// Who asked for a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOrigin {
    /// A user action or a run.
    Explicit,
    /// The autosave timer.
    Periodic,
}

/// Result of a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The snapshot was written. Generations count writes from 1.
    Written { generation: u64 },
    /// Periodic flush with nothing new to save.
    Clean,
}

struct WorkspaceState {
    project: Project,
    editor: String,
    dirty: bool,
}

impl WorkspaceState {
    fn commit_editor(&mut self) {
        if self.project.active_content() != self.editor {
            self.project.set_active_content(self.editor.clone());
            self.dirty = true;
        }
    }

    fn load_editor(&mut self) {
        self.editor = self.project.active_content().to_string();
    }
}

/// Write turn shared by all flushes.
#[derive(Default)]
struct FlushLedger {
    generation: u64,
}

/// Owns the project model and mirrors it into a [`ProjectStore`].
pub struct Workspace {
    state: Mutex<WorkspaceState>,
    store: Arc<dyn ProjectStore>,
    ledger: Mutex<FlushLedger>,
}

impl Workspace {
    /// Loads the project from `store`. Missing or corrupt data yields the
    /// default project.
    pub async fn open(store: Arc<dyn ProjectStore>) -> Self {
        let project = store.load().await;
        tracing::info!(
            "[Workspace] Opened project with {} file(s), active '{}'",
            project.len(),
            project.active_file()
        );
        Self::with_project(project, store)
    }

    /// Wraps an already loaded project.
    pub fn with_project(project: Project, store: Arc<dyn ProjectStore>) -> Self {
        let editor = project.active_content().to_string();
        Self {
            state: Mutex::new(WorkspaceState {
                project,
                editor,
                dirty: false,
            }),
            store,
            ledger: Mutex::new(FlushLedger::default()),
        }
    }

    // ============================================================================
    // Reads
    // ============================================================================

    pub async fn active_file(&self) -> String {
        self.state.lock().await.project.active_file().to_string()
    }

    /// Current editor buffer, including edits not yet flushed.
    pub async fn editor_content(&self) -> String {
        self.state.lock().await.editor.clone()
    }

    /// Content of a file as stored in the project model.
    pub async fn content(&self, name: &str) -> Option<String> {
        self.state
            .lock()
            .await
            .project
            .content(name)
            .map(str::to_string)
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.state.lock().await.project.contains(name)
    }

    /// File names in display order.
    pub async fn file_names(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .project
            .file_names()
            .map(str::to_string)
            .collect()
    }

    /// Immutable copy of the project model. Unflushed editor text is not included.
    pub async fn snapshot(&self) -> ProjectSnapshot {
        self.state.lock().await.project.snapshot()
    }

    // ============================================================================
    // Editing and persistence
    // ============================================================================

    /// Replaces the editor buffer. Nothing is saved until the next flush.
    pub async fn edit(&self, text: impl Into<String>) {
        self.state.lock().await.editor = text.into();
    }

    /// Commits the editor buffer and saves the project.
    ///
    /// Waits for any write in progress, then captures and saves the latest
    /// state. A periodic flush with nothing new to save does not write.
    pub async fn flush(&self, origin: FlushOrigin) -> Result<FlushOutcome> {
        // Lock order: ledger, then state.
        let mut ledger = self.ledger.lock().await;
        let snapshot = {
            let mut state = self.state.lock().await;
            state.commit_editor();
            if origin == FlushOrigin::Periodic && !state.dirty {
                return Ok(FlushOutcome::Clean);
            }
            state.dirty = false;
            state.project.snapshot()
        };
        let generation = ledger.generation + 1;

        if let Err(e) = self.store.save(&snapshot).await {
            tracing::warn!("[Workspace] {:?} flush #{} failed: {}", origin, generation, e);
            self.state.lock().await.dirty = true;
            return Err(e);
        }
        ledger.generation = generation;
        tracing::debug!("[Workspace] {:?} flush #{} written", origin, generation);
        Ok(FlushOutcome::Written { generation })
    }

    // ============================================================================
    // File operations
    //
    // Each operation commits pending edits first and saves afterwards. If the
    // save fails the in-memory change stands and the error is returned; the
    // next flush retries.
    // ============================================================================

    /// Creates a file with placeholder content and opens it.
    pub async fn create_file(&self, name: &str) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            state.commit_editor();
            state.project.create_file(name)?;
            state.load_editor();
            state.dirty = true;
        }
        tracing::info!("[Workspace] Created '{}'", name);
        self.flush(FlushOrigin::Explicit).await.map(|_| ())
    }

    /// Asks for a name, then creates the file. Returns `None` if cancelled.
    pub async fn create_file_interactive(&self, prompter: &dyn Prompter) -> Result<Option<String>> {
        let Some(name) = prompter.request_name("File Name (e.g. data.py):") else {
            return Ok(None);
        };
        let name = name.trim().to_string();
        if name.is_empty() {
            return Ok(None);
        }
        self.create_file(&name).await?;
        Ok(Some(name))
    }

    /// Deletes a file. If it was open, the first remaining file is opened.
    pub async fn delete_file(&self, name: &str) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            state.commit_editor();
            let was_active = state.project.active_file() == name;
            state.project.delete_file(name)?;
            if was_active {
                state.load_editor();
            }
            state.dirty = true;
        }
        tracing::info!("[Workspace] Deleted '{}'", name);
        self.flush(FlushOrigin::Explicit).await.map(|_| ())
    }

    /// Asks for confirmation, then deletes the file.
    ///
    /// Returns `Ok(false)` if the user declined. The default file is refused
    /// before anyone is asked.
    pub async fn delete_file_interactive(&self, name: &str, prompter: &dyn Prompter) -> Result<bool> {
        if name == DEFAULT_FILE_NAME {
            return Err(PyideError::ProtectedFile(name.to_string()));
        }
        if !self.contains(name).await {
            return Err(PyideError::not_found("file", name));
        }
        if !prompter.request_confirmation(&format!("Delete {}?", name)) {
            return Ok(false);
        }
        self.delete_file(name).await?;
        Ok(true)
    }

    /// Opens another file, saving the current one first.
    pub async fn switch_active(&self, name: &str) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            if !state.project.contains(name) {
                return Err(PyideError::not_found("file", name));
            }
            state.commit_editor();
            state.project.switch_active(name)?;
            state.load_editor();
        }
        tracing::debug!("[Workspace] Switched to '{}'", name);
        self.flush(FlushOrigin::Explicit).await.map(|_| ())
    }

    /// Writes `content` into `name`, creating or replacing it, and opens it.
    ///
    /// Callers are responsible for confirming a replacement.
    pub async fn put_file(&self, name: &str, content: impl Into<String>) -> Result<()> {
        validate_file_name(name)?;
        {
            let mut state = self.state.lock().await;
            state.commit_editor();
            state.project.upsert_file(name, content)?;
            state.load_editor();
            state.dirty = true;
        }
        self.flush(FlushOrigin::Explicit).await.map(|_| ())
    }
}

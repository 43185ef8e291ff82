//! Export and import of project files.

use std::sync::Arc;

use pyide_core::console::ConsoleSink;
use pyide_core::error::Result;
use pyide_core::project::validate_file_name;
use pyide_core::prompt::Prompter;

use crate::workspace::{FlushOrigin, Workspace};

/// Default name of a whole-project backup.
pub const PROJECT_BACKUP_FILE_NAME: &str = "python_project_backup.json";

/// Document handed to the user for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedDocument {
    pub file_name: String,
    pub mime_type: &'static str,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported { name: String, replaced: bool },
    /// The user declined to overwrite an existing file.
    Cancelled,
}

pub struct TransferService {
    workspace: Arc<Workspace>,
    console: Arc<ConsoleSink>,
}

impl TransferService {
    pub fn new(workspace: Arc<Workspace>, console: Arc<ConsoleSink>) -> Self {
        Self { workspace, console }
    }

    /// Exports the active file as plain text, pending edits included.
    pub async fn export_active_file(&self) -> Result<ExportedDocument> {
        self.workspace.flush(FlushOrigin::Explicit).await?;
        let snapshot = self.workspace.snapshot().await;
        let document = ExportedDocument {
            file_name: snapshot.active_file().to_string(),
            mime_type: "text/plain",
            content: snapshot.active_content().to_string(),
        };
        self.console
            .system(format!(">> Downloaded {}", document.file_name));
        Ok(document)
    }

    /// Exports every file as one pretty-printed JSON object.
    pub async fn export_project(&self) -> Result<ExportedDocument> {
        self.workspace.flush(FlushOrigin::Explicit).await?;
        let snapshot = self.workspace.snapshot().await;
        let content = serde_json::to_string_pretty(snapshot.files())?;
        tracing::info!(
            "[Transfer] Exported {} file(s) as backup",
            snapshot.files().len()
        );
        Ok(ExportedDocument {
            file_name: PROJECT_BACKUP_FILE_NAME.to_string(),
            mime_type: "application/json",
            content,
        })
    }

    /// Adds a text file to the project and opens it.
    ///
    /// Replacing an existing file needs the user's confirmation; declining
    /// leaves the project untouched.
    pub async fn import_file(
        &self,
        name: &str,
        content: impl Into<String>,
        prompter: &dyn Prompter,
    ) -> Result<ImportOutcome> {
        validate_file_name(name)?;
        let replaced = self.workspace.contains(name).await;
        if replaced && !prompter.request_confirmation(&format!("Overwrite {}?", name)) {
            tracing::debug!("[Transfer] Import of '{}' cancelled", name);
            return Ok(ImportOutcome::Cancelled);
        }

        self.workspace.put_file(name, content).await?;
        self.console.system(format!(">> Imported {}", name));
        tracing::info!("[Transfer] Imported '{}' (replaced: {})", name, replaced);
        Ok(ImportOutcome::Imported {
            name: name.to_string(),
            replaced,
        })
    }
}

//! Project store trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::project::model::{Project, ProjectSnapshot};

/// Durable slot holding the whole project.
///
/// Implementations persist the file mapping only; the active pointer is not
/// part of the durable format and a loaded project starts on the default file.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Loads the project, falling back to [`Project::default`] when the slot is
    /// missing or unreadable. Never fails.
    async fn load(&self) -> Project;

    /// Persists the full snapshot, replacing the previous content atomically.
    async fn save(&self, snapshot: &ProjectSnapshot) -> Result<()>;
}

//! In-memory project store.
//!
//! Keeps the slot in process memory. Used for throwaway sessions and tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use pyide_core::error::Result;
use pyide_core::project::{Project, ProjectFiles, ProjectSnapshot, ProjectStore};
use tokio::sync::Mutex;

#[derive(Default)]
pub struct InMemoryProjectStore {
    slot: Mutex<Option<ProjectFiles>>,
    saves: AtomicUsize,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose slot already holds `files`.
    pub fn with_files(files: ProjectFiles) -> Self {
        Self {
            slot: Mutex::new(Some(files)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Current content of the slot.
    pub async fn stored(&self) -> Option<ProjectFiles> {
        self.slot.lock().await.clone()
    }

    /// Number of completed saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn load(&self) -> Project {
        self.slot
            .lock()
            .await
            .clone()
            .and_then(Project::from_files)
            .unwrap_or_default()
    }

    async fn save(&self, snapshot: &ProjectSnapshot) -> Result<()> {
        *self.slot.lock().await = Some(snapshot.files().clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_store_loads_default() {
        let store = InMemoryProjectStore::new();
        assert_eq!(store.load().await, Project::default());
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = InMemoryProjectStore::new();
        let mut project = Project::default();
        project.create_file("b.py").unwrap();
        store.save(&project.snapshot()).await.unwrap();

        let loaded = store.load().await;
        assert!(loaded.contains("b.py"));
        assert_eq!(store.save_count(), 1);
    }
}

//! Periodic background flush of the workspace.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::workspace::{FlushOrigin, Workspace};

/// Running autosave task. Stop it with [`Autosave::shutdown`].
pub struct Autosave {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Autosave {
    /// Spawns a task that flushes `workspace` every `interval`.
    ///
    /// The first flush happens one interval after spawning.
    pub fn spawn(workspace: Arc<Workspace>, interval: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::debug!("[Autosave] Started with interval {:?}", interval);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = workspace.flush(FlushOrigin::Periodic).await {
                            tracing::warn!("[Autosave] Flush failed: {}", e);
                        }
                    }
                }
            }
            tracing::debug!("[Autosave] Stopped");
        });

        Self { cancel, task }
    }

    /// Stops the task and waits for an in-flight flush to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!("[Autosave] Task ended abnormally: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pyide_core::error::Result;
    use pyide_core::project::{Project, ProjectSnapshot, ProjectStore};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingStore {
        saves: AtomicUsize,
    }

    #[async_trait]
    impl ProjectStore for CountingStore {
        async fn load(&self) -> Project {
            Project::default()
        }

        async fn save(&self, _snapshot: &ProjectSnapshot) -> Result<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_flushes_only_after_edits() {
        let store = Arc::new(CountingStore::default());
        let workspace = Arc::new(Workspace::open(store.clone()).await);
        let autosave = Autosave::spawn(workspace.clone(), Duration::from_millis(1500));

        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);

        workspace.edit("print('saved later')").await;
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);

        autosave.shutdown().await;
        workspace.edit("after shutdown").await;
        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    }
}

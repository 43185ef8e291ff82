//! Application context: wires the workspace, engine and console together.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use pyide_core::console::ConsoleSink;
use pyide_core::engine::ExecutionBackend;
use pyide_core::error::Result;
use pyide_core::project::ProjectStore;
use pyide_execution::EngineHandle;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::autosave::Autosave;
use crate::orchestrator::RunOrchestrator;
use crate::transfer::TransferService;
use crate::view::{View, ViewState};
use crate::workspace::{FlushOrigin, Workspace};

/// One editing session.
pub struct AppContext {
    pub workspace: Arc<Workspace>,
    pub engine: Arc<EngineHandle>,
    pub console: Arc<ConsoleSink>,
    pub view: Arc<ViewState>,
    pub runner: RunOrchestrator,
    pub transfer: TransferService,
    autosave: Mutex<Option<Autosave>>,
}

impl AppContext {
    /// Loads the project. The engine stays uninitialized until
    /// [`AppContext::start_engine`] is called.
    pub async fn open(store: Arc<dyn ProjectStore>) -> Self {
        let workspace = Arc::new(Workspace::open(store).await);
        let engine = Arc::new(EngineHandle::new());
        let console = Arc::new(ConsoleSink::new());
        let view = Arc::new(ViewState::new());

        let runner = RunOrchestrator::new(
            workspace.clone(),
            engine.clone(),
            console.clone(),
            view.clone(),
        );
        let transfer = TransferService::new(workspace.clone(), console.clone());

        tracing::info!("[App] Session {} opened", engine.session_id());
        Self {
            workspace,
            engine,
            console,
            view,
            runner,
            transfer,
            autosave: Mutex::new(None),
        }
    }

    /// Boots the engine in the background and reports the result on the console.
    pub fn start_engine<F>(&self, boot: F) -> Result<JoinHandle<()>>
    where
        F: Future<Output = Result<Arc<dyn ExecutionBackend>>> + Send + 'static,
    {
        let initialization = self.engine.start(boot)?;
        let console = self.console.clone();
        Ok(tokio::spawn(async move {
            match initialization.await {
                Ok(Ok(banner)) => {
                    console.system(format!(">> {} ready.", banner));
                }
                Ok(Err(e)) => {
                    console.error(format!("Error: {}", e));
                }
                Err(e) => {
                    tracing::error!("[App] Engine initialization task panicked: {}", e);
                    console.error(format!("Error: engine initialization aborted: {}", e));
                }
            }
        }))
    }

    /// Starts the periodic flush. Replaces a previously started one.
    pub async fn start_autosave(&self, interval: Duration) {
        let previous = self
            .autosave
            .lock()
            .await
            .replace(Autosave::spawn(self.workspace.clone(), interval));
        if let Some(previous) = previous {
            previous.shutdown().await;
        }
    }

    /// Opens a file in the editor.
    pub async fn open_file(&self, name: &str) -> Result<()> {
        self.workspace.switch_active(name).await?;
        self.view.set(View::Editor);
        Ok(())
    }

    /// Stops autosave and writes any pending edits.
    pub async fn shutdown(&self) -> Result<()> {
        if let Some(autosave) = self.autosave.lock().await.take() {
            autosave.shutdown().await;
        }
        self.workspace.flush(FlushOrigin::Explicit).await?;
        tracing::info!("[App] Session {} closed", self.engine.session_id());
        Ok(())
    }
}

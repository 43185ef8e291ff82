//! The run pipeline: save, sync, execute, stream.
//!
//! A run always executes the active file against the latest saved state of
//! every project file. Files are written into the engine on each run and
//! never removed from it, so a file deleted from the project stays importable
//! inside the engine until the session ends.

use std::sync::Arc;

use pyide_core::console::ConsoleSink;
use pyide_core::engine::{EngineState, ExecutionOutcome, ExecutionRequest, OutputChunk, OutputStream};
use pyide_core::error::PyideError;
use pyide_execution::EngineHandle;
use tokio::sync::{Mutex, mpsc};

use crate::view::{View, ViewState};
use crate::workspace::{FlushOrigin, Workspace};

pub const MSG_ENGINE_LOADING: &str = ">> Engine still loading, try again.";
pub const MSG_RUN_IN_PROGRESS: &str = ">> A run is already in progress.";
pub const MSG_SYNCING: &str = ">> Syncing files...";

/// Why a run did not start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunRejection {
    NotReady(EngineState),
    EngineFailed(String),
    Busy,
}

/// How a run request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunReport {
    /// The program ran; `outcome` says whether it raised.
    Completed {
        entry: String,
        outcome: ExecutionOutcome,
    },
    /// Nothing was executed.
    Rejected(RunRejection),
    /// The engine failed while syncing or executing.
    Failed { message: String },
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            RunReport::Completed {
                outcome: ExecutionOutcome::Success,
                ..
            }
        )
    }
}

pub struct RunOrchestrator {
    workspace: Arc<Workspace>,
    engine: Arc<EngineHandle>,
    console: Arc<ConsoleSink>,
    view: Arc<ViewState>,
    run_lock: Mutex<()>,
}

impl RunOrchestrator {
    pub fn new(
        workspace: Arc<Workspace>,
        engine: Arc<EngineHandle>,
        console: Arc<ConsoleSink>,
        view: Arc<ViewState>,
    ) -> Self {
        Self {
            workspace,
            engine,
            console,
            view,
            run_lock: Mutex::new(()),
        }
    }

    /// Runs the active file.
    ///
    /// Outcomes are reported through the console; the returned report is for
    /// callers that need to branch on them.
    pub async fn run(&self) -> RunReport {
        let Ok(_running) = self.run_lock.try_lock() else {
            self.console.system(MSG_RUN_IN_PROGRESS);
            return RunReport::Rejected(RunRejection::Busy);
        };

        // The engine reads the in-memory model, so a failed save does not stop the run.
        if let Err(e) = self.workspace.flush(FlushOrigin::Explicit).await {
            self.console.error(format!("Save failed: {}", e));
        }

        self.view.set(View::Console);

        if let Err(e) = self.engine.ensure_ready() {
            return self.reject(e);
        }

        self.console.system(MSG_SYNCING);
        let snapshot = self.workspace.snapshot().await;
        for (name, content) in snapshot.files() {
            if let Err(e) = self.engine.write_file(name, content).await {
                tracing::error!("[Orchestrator] Sync of '{}' failed: {}", name, e);
                return self.fail(format!("Failed to sync {}: {}", name, e));
            }
        }

        let entry = snapshot.active_file().to_string();
        self.console.system(format!(">> Running {}...", entry));

        if let Err(e) = self.engine.reset().await {
            tracing::warn!("[Orchestrator] Engine reset failed: {}", e);
        }

        let request = ExecutionRequest {
            entry: entry.clone(),
            source: snapshot.active_content().to_string(),
        };
        let (tx, mut rx) = mpsc::unbounded_channel();
        let execution = self.engine.execute(request, tx);
        tokio::pin!(execution);

        let result = loop {
            tokio::select! {
                biased;
                Some(chunk) = rx.recv() => self.forward(chunk),
                result = &mut execution => break result,
            }
        };
        while let Ok(chunk) = rx.try_recv() {
            self.forward(chunk);
        }

        match result {
            Ok(outcome) => {
                if let ExecutionOutcome::RuntimeError { message } = &outcome {
                    self.console.error(message.clone());
                }
                tracing::info!("[Orchestrator] {} finished (success: {})", entry, outcome.is_success());
                RunReport::Completed { entry, outcome }
            }
            Err(PyideError::EngineBusy) => self.reject(PyideError::EngineBusy),
            Err(e) => {
                tracing::error!("[Orchestrator] {} failed: {}", entry, e);
                self.fail(e.to_string())
            }
        }
    }

    fn forward(&self, chunk: OutputChunk) {
        match chunk.stream {
            OutputStream::Stdout => self.console.normal(chunk.text),
            OutputStream::Stderr => self.console.error(chunk.text),
        };
    }

    fn reject(&self, error: PyideError) -> RunReport {
        let rejection = match error {
            PyideError::EngineNotReady { state } => {
                self.console.system(MSG_ENGINE_LOADING);
                RunRejection::NotReady(state)
            }
            PyideError::EngineFailed(reason) => {
                self.console
                    .system(format!(">> Engine unavailable: {}", reason));
                RunRejection::EngineFailed(reason)
            }
            PyideError::EngineBusy => {
                self.console.system(MSG_RUN_IN_PROGRESS);
                RunRejection::Busy
            }
            other => return self.fail(other.to_string()),
        };
        tracing::info!("[Orchestrator] Rejected: {:?}", rejection);
        RunReport::Rejected(rejection)
    }

    fn fail(&self, message: String) -> RunReport {
        self.console.error(message.clone());
        RunReport::Failed { message }
    }
}

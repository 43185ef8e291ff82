//! Engine handle: the lifecycle state machine around one backend.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use pyide_core::engine::{
    EngineState, ExecutionBackend, ExecutionOutcome, ExecutionRequest, OutputSender,
};
use pyide_core::error::{PyideError, Result};
use tokio::task::JoinHandle;
use uuid::Uuid;

struct Inner {
    state: EngineState,
    backend: Option<Arc<dyn ExecutionBackend>>,
    failure: Option<String>,
}

/// One engine session.
///
/// Created once per application session. Initialization happens at most once;
/// a failed initialization is final and every later request is rejected.
/// At most one execution runs at a time.
pub struct EngineHandle {
    session_id: Uuid,
    inner: Mutex<Inner>,
}

impl Default for EngineHandle {
    fn default() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            inner: Mutex::new(Inner {
                state: EngineState::Uninitialized,
                backend: None,
                failure: None,
            }),
        }
    }
}

impl EngineHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // State updates are single assignments; a poisoned lock still holds a valid state.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> EngineState {
        self.lock().state
    }

    /// Reason of a failed initialization.
    pub fn failure(&self) -> Option<String> {
        self.lock().failure.clone()
    }

    /// Description of the ready backend.
    pub fn describe(&self) -> Option<String> {
        self.lock().backend.as_ref().map(|backend| backend.describe())
    }

    /// Marks the engine as initializing. Fails if it was already started.
    fn begin_initialization(&self) -> Result<()> {
        let mut inner = self.lock();
        if inner.state != EngineState::Uninitialized {
            return Err(PyideError::internal(format!(
                "Engine session {} was already started (state: {})",
                self.session_id, inner.state
            )));
        }
        inner.state = EngineState::Initializing;
        Ok(())
    }

    fn finish_initialization(&self, booted: Result<Arc<dyn ExecutionBackend>>) -> Result<String> {
        let mut inner = self.lock();
        match booted {
            Ok(backend) => {
                let banner = backend.describe();
                inner.backend = Some(backend);
                inner.state = EngineState::Ready;
                tracing::info!("[Engine] Session {} ready: {}", self.session_id, banner);
                Ok(banner)
            }
            Err(e) => {
                let reason = e.to_string();
                inner.failure = Some(reason.clone());
                inner.state = EngineState::Failed;
                tracing::error!("[Engine] Session {} failed to initialize: {}", self.session_id, reason);
                Err(PyideError::EngineFailed(reason))
            }
        }
    }

    /// Runs `boot` to completion and records the result.
    ///
    /// Returns the backend description on success.
    pub async fn initialize<F>(&self, boot: F) -> Result<String>
    where
        F: Future<Output = Result<Arc<dyn ExecutionBackend>>>,
    {
        self.begin_initialization()?;
        self.finish_initialization(boot.await)
    }

    /// Starts initialization in the background.
    ///
    /// The state is `Initializing` as soon as this returns, so requests made
    /// while `boot` runs are rejected as not ready rather than queued.
    pub fn start<F>(self: &Arc<Self>, boot: F) -> Result<JoinHandle<Result<String>>>
    where
        F: Future<Output = Result<Arc<dyn ExecutionBackend>>> + Send + 'static,
    {
        self.begin_initialization()?;
        let handle = Arc::clone(self);
        Ok(tokio::spawn(async move {
            let booted = boot.await;
            handle.finish_initialization(booted)
        }))
    }

    /// Checks the state and returns the backend if a request may proceed.
    fn ready_backend(&self) -> Result<Arc<dyn ExecutionBackend>> {
        let inner = self.lock();
        match inner.state {
            EngineState::Ready => inner
                .backend
                .clone()
                .ok_or_else(|| PyideError::internal("Ready engine has no backend")),
            EngineState::Running => Err(PyideError::EngineBusy),
            EngineState::Failed => Err(PyideError::EngineFailed(
                inner.failure.clone().unwrap_or_default(),
            )),
            state @ (EngineState::Uninitialized | EngineState::Initializing) => {
                Err(PyideError::EngineNotReady { state })
            }
        }
    }

    /// Fails unless the engine is ready for a new run.
    pub fn ensure_ready(&self) -> Result<()> {
        self.ready_backend().map(|_| ())
    }

    /// Creates or overwrites a file in the engine filesystem.
    pub async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let backend = self.ready_backend()?;
        backend.write_file(path, content).await
    }

    /// Clears per-run interpreter state.
    pub async fn reset(&self) -> Result<()> {
        let backend = self.ready_backend()?;
        backend.reset().await
    }

    /// Executes a request, streaming output into `output`.
    ///
    /// Rejected with [`PyideError::EngineBusy`] while another execution runs.
    /// The engine returns to `Ready` when the execution ends, whether it
    /// succeeded, raised, or the future was dropped.
    pub async fn execute(
        &self,
        request: ExecutionRequest,
        output: OutputSender,
    ) -> Result<ExecutionOutcome> {
        let backend = {
            let mut inner = self.lock();
            match inner.state {
                EngineState::Ready => {}
                EngineState::Running => return Err(PyideError::EngineBusy),
                EngineState::Failed => {
                    return Err(PyideError::EngineFailed(
                        inner.failure.clone().unwrap_or_default(),
                    ));
                }
                state => return Err(PyideError::EngineNotReady { state }),
            }
            let backend = inner
                .backend
                .clone()
                .ok_or_else(|| PyideError::internal("Ready engine has no backend"))?;
            inner.state = EngineState::Running;
            backend
        };

        let _running = RunningGuard { handle: self };
        tracing::debug!("[Engine] Executing {}", request.entry);
        backend.execute(request, output).await
    }
}

/// Puts the engine back to `Ready` when an execution ends.
struct RunningGuard<'a> {
    handle: &'a EngineHandle,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.handle.lock();
        if inner.state == EngineState::Running {
            inner.state = EngineState::Ready;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pyide_core::engine::OutputChunk;
    use tokio::sync::{Notify, mpsc};

    /// Backend that blocks each execution until released.
    #[derive(Default)]
    struct GatedBackend {
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ExecutionBackend for GatedBackend {
        fn describe(&self) -> String {
            "gated".to_string()
        }

        async fn write_file(&self, _path: &str, _content: &str) -> Result<()> {
            Ok(())
        }

        async fn reset(&self) -> Result<()> {
            Ok(())
        }

        async fn execute(
            &self,
            request: ExecutionRequest,
            output: OutputSender,
        ) -> Result<ExecutionOutcome> {
            let _ = output.send(OutputChunk::stdout(format!("start {}", request.entry)));
            self.started.notify_one();
            self.release.notified().await;
            let _ = output.send(OutputChunk::stdout(format!("end {}", request.entry)));
            Ok(ExecutionOutcome::Success)
        }
    }

    fn request(entry: &str) -> ExecutionRequest {
        ExecutionRequest {
            entry: entry.to_string(),
            source: String::new(),
        }
    }

    async fn ready_with(backend: Arc<GatedBackend>) -> Arc<EngineHandle> {
        let handle = Arc::new(EngineHandle::new());
        let boot_backend: Arc<dyn ExecutionBackend> = backend;
        handle
            .initialize(async move { Ok(boot_backend) })
            .await
            .unwrap();
        handle
    }

    #[tokio::test]
    async fn test_uninitialized_rejects_requests() {
        let handle = EngineHandle::new();
        assert_eq!(handle.state(), EngineState::Uninitialized);
        let err = handle.write_file("main.py", "").await.unwrap_err();
        assert_eq!(
            err,
            PyideError::EngineNotReady {
                state: EngineState::Uninitialized
            }
        );
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(matches!(
            handle.execute(request("main.py"), tx).await,
            Err(PyideError::EngineNotReady { .. })
        ));
    }

    #[tokio::test]
    async fn test_initializing_rejects_without_waiting() {
        let handle = Arc::new(EngineHandle::new());
        let gate = Arc::new(Notify::new());
        let boot_gate = gate.clone();
        let join = handle
            .start(async move {
                boot_gate.notified().await;
                let backend: Arc<dyn ExecutionBackend> = Arc::new(GatedBackend::default());
                Ok(backend)
            })
            .unwrap();

        assert_eq!(handle.state(), EngineState::Initializing);
        assert_eq!(
            handle.ensure_ready().unwrap_err(),
            PyideError::EngineNotReady {
                state: EngineState::Initializing
            }
        );

        gate.notify_one();
        assert_eq!(join.await.unwrap().unwrap(), "gated");
        assert_eq!(handle.state(), EngineState::Ready);
    }

    #[tokio::test]
    async fn test_failed_initialization_is_permanent() {
        let handle = EngineHandle::new();
        let result = handle
            .initialize(async { Err(PyideError::execution("no interpreter")) })
            .await;
        assert!(matches!(result, Err(PyideError::EngineFailed(_))));
        assert_eq!(handle.state(), EngineState::Failed);
        assert!(handle.failure().unwrap().contains("no interpreter"));

        assert!(matches!(
            handle.ensure_ready(),
            Err(PyideError::EngineFailed(_))
        ));
        // No second attempt.
        let retry = handle
            .initialize(async {
                let backend: Arc<dyn ExecutionBackend> = Arc::new(GatedBackend::default());
                Ok(backend)
            })
            .await;
        assert!(retry.is_err());
        assert_eq!(handle.state(), EngineState::Failed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_second_execute_is_rejected_while_running() {
        let backend = Arc::new(GatedBackend::default());
        let handle = ready_with(backend.clone()).await;
        let (tx, mut rx) = mpsc::unbounded_channel();

        let first = {
            let handle = handle.clone();
            let tx = tx.clone();
            tokio::spawn(async move { handle.execute(request("a.py"), tx).await })
        };
        backend.started.notified().await;
        assert_eq!(handle.state(), EngineState::Running);

        let second = handle.execute(request("b.py"), tx.clone()).await;
        assert_eq!(second.unwrap_err(), PyideError::EngineBusy);

        backend.release.notify_one();
        assert!(first.await.unwrap().unwrap().is_success());
        assert_eq!(handle.state(), EngineState::Ready);

        drop(tx);
        let mut texts = Vec::new();
        while let Some(chunk) = rx.recv().await {
            texts.push(chunk.text);
        }
        assert_eq!(texts, vec!["start a.py", "end a.py"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_dropped_execution_returns_to_ready() {
        let backend = Arc::new(GatedBackend::default());
        let handle = ready_with(backend.clone()).await;
        let (tx, _rx) = mpsc::unbounded_channel();

        let running = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.execute(request("a.py"), tx).await })
        };
        backend.started.notified().await;
        running.abort();
        let _ = running.await;

        assert_eq!(handle.state(), EngineState::Ready);
    }
}

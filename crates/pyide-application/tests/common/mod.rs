#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use pyide_application::AppContext;
use pyide_core::console::{ConsoleEntry, ConsoleKind};
use pyide_core::engine::{
    ExecutionBackend, ExecutionOutcome, ExecutionRequest, OutputChunk, OutputSender,
};
use pyide_core::error::Result;
use pyide_core::project::ProjectFiles;
use pyide_infrastructure::InMemoryProjectStore;

/// Backend that understands a tiny line-based language:
///
/// - `print(x)` writes `x` to stdout
/// - `warn(x)` writes `x` to stderr
/// - `import m` runs `m.py` from the engine filesystem
/// - `raise X` stops with a runtime error
#[derive(Default)]
pub struct ScriptedBackend {
    files: Mutex<BTreeMap<String, String>>,
    writes: AtomicUsize,
    resets: AtomicUsize,
}

impl ScriptedBackend {
    pub fn file(&self, name: &str) -> Option<String> {
        self.files.lock().unwrap().get(name).cloned()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn reset_count(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    fn interpret(&self, source: &str, output: &OutputSender, depth: usize) -> std::result::Result<(), String> {
        if depth > 8 {
            return Err("RecursionError: import cycle".to_string());
        }
        for line in source.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(arg) = call_argument(line, "print") {
                let _ = output.send(OutputChunk::stdout(arg));
            } else if let Some(arg) = call_argument(line, "warn") {
                let _ = output.send(OutputChunk::stderr(arg));
            } else if let Some(module) = line.strip_prefix("import ") {
                let source = self
                    .file(&format!("{}.py", module.trim()))
                    .ok_or_else(|| format!("ModuleNotFoundError: No module named '{}'", module.trim()))?;
                self.interpret(&source, output, depth + 1)?;
            } else if let Some(error) = line.strip_prefix("raise ") {
                return Err(error.to_string());
            }
        }
        Ok(())
    }
}

fn call_argument<'a>(line: &'a str, function: &str) -> Option<&'a str> {
    line.strip_prefix(function)?
        .strip_prefix('(')?
        .strip_suffix(')')
        .map(|arg| arg.trim_matches(|c| c == '"' || c == '\''))
}

#[async_trait]
impl ExecutionBackend for ScriptedBackend {
    fn describe(&self) -> String {
        "Scripted 1.0".to_string()
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_string());
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn execute(&self, request: ExecutionRequest, output: OutputSender) -> Result<ExecutionOutcome> {
        Ok(match self.interpret(&request.source, &output, 0) {
            Ok(()) => ExecutionOutcome::Success,
            Err(message) => ExecutionOutcome::RuntimeError { message },
        })
    }
}

pub fn files(entries: &[(&str, &str)]) -> ProjectFiles {
    entries
        .iter()
        .map(|(name, content)| (name.to_string(), content.to_string()))
        .collect()
}

/// Context over an in-memory store holding `initial`, engine not started.
pub async fn open_context(initial: ProjectFiles) -> (AppContext, Arc<InMemoryProjectStore>) {
    let store = Arc::new(InMemoryProjectStore::with_files(initial));
    let context = AppContext::open(store.clone()).await;
    (context, store)
}

/// Boots `backend` and waits until the engine is ready.
pub async fn boot(context: &AppContext, backend: Arc<ScriptedBackend>) {
    let backend: Arc<dyn ExecutionBackend> = backend;
    context
        .start_engine(async move { Ok(backend) })
        .unwrap()
        .await
        .unwrap();
}

pub fn lines(entries: &[ConsoleEntry]) -> Vec<(ConsoleKind, &str)> {
    entries.iter().map(|e| (e.kind, e.text.as_str())).collect()
}

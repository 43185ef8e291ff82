//! Subprocess interpreter backend.
//!
//! Each run starts a fresh interpreter process whose working directory is a
//! private temporary directory. That directory is the engine's virtual
//! filesystem: project files are written into it before a run and it is
//! deleted when the backend is dropped. The entry file is run by path, so
//! programs see a real `__file__` and tracebacks name their files.

use std::path::{Component, Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use pyide_core::config::InterpreterConfig;
use pyide_core::engine::{
    ExecutionBackend, ExecutionOutcome, ExecutionRequest, OutputChunk, OutputSender,
};
use pyide_core::error::{PyideError, Result};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// Directory the interpreter uses for cached bytecode.
const BYTECODE_CACHE_DIR: &str = "__pycache__";

pub struct ProcessBackend {
    config: InterpreterConfig,
    sandbox: TempDir,
    version: String,
}

impl ProcessBackend {
    /// Probes the interpreter and creates the sandbox directory.
    ///
    /// Fails if the interpreter cannot be launched or the probe exits
    /// unsuccessfully.
    pub async fn boot(config: InterpreterConfig) -> Result<Self> {
        tracing::info!("[Engine] Probing interpreter '{}'", config.program);
        let probe = Command::new(&config.program)
            .args(&config.probe_args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                PyideError::execution(format!("Cannot launch '{}': {}", config.program, e))
            })?;

        if !probe.status.success() {
            return Err(PyideError::execution(format!(
                "Interpreter probe '{}' exited with {}",
                config.program, probe.status
            )));
        }

        // Some interpreters print their version on stderr.
        let stdout = String::from_utf8_lossy(&probe.stdout).trim().to_string();
        let version = if stdout.is_empty() {
            String::from_utf8_lossy(&probe.stderr).trim().to_string()
        } else {
            stdout
        };
        let version = if version.is_empty() {
            config.program.clone()
        } else {
            version
        };

        let sandbox = tempfile::Builder::new().prefix("pyide-").tempdir()?;
        tracing::debug!("[Engine] Sandbox at {:?}", sandbox.path());

        Ok(Self {
            config,
            sandbox,
            version,
        })
    }

    /// Root of the sandbox directory.
    pub fn sandbox_path(&self) -> &Path {
        self.sandbox.path()
    }

    /// Maps a project path into the sandbox, refusing anything that would
    /// land outside it.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let is_plain = !path.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !is_plain {
            return Err(PyideError::execution(format!(
                "Path '{}' is outside the sandbox",
                path
            )));
        }
        Ok(self.sandbox.path().join(relative))
    }
}

#[async_trait]
impl ExecutionBackend for ProcessBackend {
    fn describe(&self) -> String {
        self.version.clone()
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, content).await?;
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        let cache = self.sandbox.path().join(BYTECODE_CACHE_DIR);
        match tokio::fs::remove_dir_all(&cache).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn execute(
        &self,
        request: ExecutionRequest,
        output: OutputSender,
    ) -> Result<ExecutionOutcome> {
        // The entry on disk must match the source being run.
        let script = self.resolve(&request.entry)?;
        self.write_file(&request.entry, &request.source).await?;

        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .arg(&script)
            .current_dir(self.sandbox.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                PyideError::execution(format!("Cannot start '{}': {}", self.config.program, e))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PyideError::internal("Child stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| PyideError::internal("Child stderr was not captured"))?;

        let stdout_task = tokio::spawn(forward_lines(stdout, output.clone(), |line| {
            OutputChunk::stdout(line)
        }));
        let stderr_task = tokio::spawn(forward_lines(stderr, output, |line| {
            OutputChunk::stderr(line)
        }));

        let status = child.wait().await?;
        // Readers end at EOF, which follows process exit.
        let _ = stdout_task.await;
        let _ = stderr_task.await;

        tracing::debug!("[Engine] {} finished with {}", request.entry, status);
        if status.success() {
            Ok(ExecutionOutcome::Success)
        } else {
            Ok(ExecutionOutcome::RuntimeError {
                message: format!("{} exited with {}", request.entry, status),
            })
        }
    }
}

/// Sends each line of `reader` as a chunk until EOF.
///
/// Bytes that are not UTF-8 are replaced rather than ending the stream, and
/// the pipe is drained to EOF even after the receiver is gone so the child
/// never blocks on a full pipe.
async fn forward_lines<R>(reader: R, output: OutputSender, chunk: fn(String) -> OutputChunk)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut receiving = true;
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if !receiving {
                    continue;
                }
                let line = String::from_utf8_lossy(trim_line_ending(&buf)).into_owned();
                if output.send(chunk(line)).is_err() {
                    receiving = false;
                }
            }
            Err(e) => {
                tracing::warn!("[Engine] Output stream read failed: {}", e);
                break;
            }
        }
    }
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pyide_core::engine::OutputStream;
    use tokio::sync::mpsc;

    /// `sh` stands in for the interpreter: it runs a script file by path the same way.
    fn shell_config() -> InterpreterConfig {
        InterpreterConfig {
            program: "sh".to_string(),
            args: Vec::new(),
            probe_args: vec!["-c".to_string(), "echo sh-probe".to_string()],
        }
    }

    async fn run(backend: &ProcessBackend, source: &str) -> (ExecutionOutcome, Vec<OutputChunk>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let outcome = backend
            .execute(
                ExecutionRequest {
                    entry: "main.py".to_string(),
                    source: source.to_string(),
                },
                tx,
            )
            .await
            .unwrap();
        let mut chunks = Vec::new();
        while let Some(chunk) = rx.recv().await {
            chunks.push(chunk);
        }
        (outcome, chunks)
    }

    #[tokio::test]
    async fn test_boot_reports_probe_output() {
        let backend = ProcessBackend::boot(shell_config()).await.unwrap();
        assert_eq!(backend.describe(), "sh-probe");
        assert!(backend.sandbox_path().is_dir());
    }

    #[tokio::test]
    async fn test_boot_fails_for_missing_interpreter() {
        let config = InterpreterConfig {
            program: "pyide-no-such-interpreter".to_string(),
            ..shell_config()
        };
        assert!(ProcessBackend::boot(config).await.is_err());
    }

    #[tokio::test]
    async fn test_stdout_lines_stream_in_order() {
        let backend = ProcessBackend::boot(shell_config()).await.unwrap();
        let (outcome, chunks) = run(&backend, "echo 1; echo 2; echo 3").await;
        assert!(outcome.is_success());
        let texts: Vec<_> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["1", "2", "3"]);
        assert!(chunks.iter().all(|c| c.stream == OutputStream::Stdout));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_runtime_error() {
        let backend = ProcessBackend::boot(shell_config()).await.unwrap();
        let (outcome, chunks) = run(&backend, "echo oops >&2; exit 3").await;
        assert!(matches!(outcome, ExecutionOutcome::RuntimeError { .. }));
        assert_eq!(chunks, vec![OutputChunk::stderr("oops")]);
    }

    #[tokio::test]
    async fn test_written_files_are_visible_to_the_program() {
        let backend = ProcessBackend::boot(shell_config()).await.unwrap();
        backend.write_file("data.txt", "hello\n").await.unwrap();
        backend.write_file("data.txt", "replaced\n").await.unwrap();
        let (_, chunks) = run(&backend, "cat data.txt").await;
        assert_eq!(chunks, vec![OutputChunk::stdout("replaced")]);
    }

    #[tokio::test]
    async fn test_paths_cannot_escape_the_sandbox() {
        let backend = ProcessBackend::boot(shell_config()).await.unwrap();
        for path in ["../escape.txt", "/etc/passwd", "", "a/../../b"] {
            assert!(backend.write_file(path, "x").await.is_err(), "{path:?}");
        }
    }

    #[tokio::test]
    async fn test_invalid_utf8_output_keeps_streaming() {
        let backend = ProcessBackend::boot(shell_config()).await.unwrap();
        let (outcome, chunks) = run(&backend, "echo before; printf '\\377\\n'; echo after").await;
        assert!(outcome.is_success());
        assert_eq!(
            chunks,
            vec![
                OutputChunk::stdout("before"),
                OutputChunk::stdout("\u{FFFD}"),
                OutputChunk::stdout("after"),
            ]
        );
    }

    #[tokio::test]
    async fn test_large_source_runs() {
        let backend = ProcessBackend::boot(shell_config()).await.unwrap();
        let padding = format!("# {}\n", "x".repeat(200)).repeat(1000);
        let source = format!("{padding}echo done");
        assert!(source.len() > 128 * 1024);

        let (outcome, chunks) = run(&backend, &source).await;
        assert!(outcome.is_success());
        assert_eq!(chunks, vec![OutputChunk::stdout("done")]);
    }

    #[tokio::test]
    async fn test_entry_runs_from_its_file() {
        let backend = ProcessBackend::boot(shell_config()).await.unwrap();
        let (outcome, chunks) = run(&backend, "echo \"$0\"").await;
        assert!(outcome.is_success());
        assert_eq!(
            chunks,
            vec![OutputChunk::stdout(backend.sandbox_path().join("main.py").display().to_string())]
        );
    }

    #[tokio::test]
    async fn test_reset_clears_bytecode_cache() {
        let backend = ProcessBackend::boot(shell_config()).await.unwrap();
        backend.reset().await.unwrap();
        backend
            .write_file("__pycache__/util.cpython.pyc", "stale")
            .await
            .unwrap();
        backend.reset().await.unwrap();
        assert!(!backend.sandbox_path().join(BYTECODE_CACHE_DIR).exists());
    }
}

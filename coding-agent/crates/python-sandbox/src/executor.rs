//! Sandboxed Executor - time-boxed subprocess execution of validated code
//!
//! Each call:
//! - writes the code to a fresh, uniquely named scratch file
//! - runs it with the configured interpreter as a separate OS process
//! - captures stdout/stderr (bounded) and enforces the policy timeout
//! - kills and reaps the child on timeout
//! - removes the scratch file on every return path
//!
//! No syscall filtering, filesystem or network restriction is applied; the
//! child has the same privileges as the host process.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::{Duration, Instant};

use tempfile::{Builder, TempPath};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::error::SandboxError;
use crate::policy::Policy;
use crate::process::{default_python_command, SandboxedCommand};
use crate::protocol::{ExecutionClassification, ExecutionResult};
use crate::validator::ValidatedCode;

/// Maximum captured output per stream (in bytes)
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024; // 1MB

const TRUNCATION_MARKER: &str = "\n... [output truncated]";

const SCRATCH_PREFIX: &str = "sandbox-";
const SCRATCH_SUFFIX: &str = ".py";

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Interpreter invoked as `<python_command> <scratch file>`.
    pub python_command: String,
    /// Directory for scratch files. `None` uses the system temp dir.
    pub scratch_dir: Option<PathBuf>,
    /// Per-stream capture limit; the remainder is drained and discarded.
    pub max_output_bytes: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            python_command: default_python_command().to_string(),
            scratch_dir: None,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

/// On-disk copy of the code for exactly one execution.
///
/// Removed explicitly by [`TemporaryArtifact::remove`], or on drop if the
/// executor future is cancelled or unwinds.
pub struct TemporaryArtifact {
    location: PathBuf,
    path: Option<TempPath>,
}

impl TemporaryArtifact {
    pub fn create(dir: &Path, source: &str) -> Result<Self, SandboxError> {
        let mut file = Builder::new()
            .prefix(SCRATCH_PREFIX)
            .suffix(SCRATCH_SUFFIX)
            .tempfile_in(dir)
            .map_err(|source| SandboxError::ScratchFile {
                dir: dir.to_path_buf(),
                source,
            })?;

        // On failure `file` is dropped here, which deletes it.
        file.write_all(source.as_bytes())
            .and_then(|_| file.flush())
            .map_err(SandboxError::WriteSource)?;

        let path = file.into_temp_path();
        Ok(Self {
            location: path.to_path_buf(),
            path: Some(path),
        })
    }

    pub fn path(&self) -> &Path {
        &self.location
    }

    pub fn remove(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(path) = self.path.take() {
            match path.close() {
                Ok(()) => {
                    tracing::debug!(path = %self.location.display(), "[Executor] Removed scratch file");
                }
                Err(err) => {
                    tracing::warn!(
                        path = %self.location.display(),
                        error = %err,
                        "[Executor] Failed to remove scratch file"
                    );
                }
            }
        }
    }
}

impl Drop for TemporaryArtifact {
    fn drop(&mut self) {
        self.release();
    }
}

enum RunOutcome {
    Exited {
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
    TimedOut,
}

/// Runs validated code in a child interpreter.
///
/// Holds no per-call state, so one executor can serve concurrent calls.
#[derive(Debug, Clone, Default)]
pub struct SandboxExecutor {
    config: ExecutorConfig,
}

impl SandboxExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute `code` under `policy.timeout()`.
    ///
    /// Never fails: every outcome, including a failure to start the
    /// interpreter, is a classification.
    pub async fn execute(&self, code: &ValidatedCode, policy: &Policy) -> ExecutionResult {
        let started = Instant::now();
        let scratch_dir = self
            .config
            .scratch_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);

        let artifact = match TemporaryArtifact::create(&scratch_dir, code.as_str()) {
            Ok(artifact) => artifact,
            Err(err) => {
                tracing::error!(error = %err, "[Executor] Could not materialize code");
                return ExecutionResult::launch_failed(err.to_string(), elapsed_ms(started));
            }
        };

        tracing::info!(
            script = %artifact.path().display(),
            timeout_ms = policy.timeout().as_millis() as u64,
            "[Executor] Running validated code"
        );

        let result = match self.run(artifact.path(), policy.timeout()).await {
            Ok(RunOutcome::Exited {
                status,
                stdout,
                stderr,
            }) => {
                let classification = if status.success() {
                    ExecutionClassification::Success
                } else {
                    ExecutionClassification::RuntimeError {
                        stderr,
                        exit_code: status.code(),
                    }
                };
                ExecutionResult {
                    stdout,
                    classification,
                    duration_ms: elapsed_ms(started),
                }
            }
            Ok(RunOutcome::TimedOut) => ExecutionResult {
                stdout: String::new(),
                classification: ExecutionClassification::TimedOut,
                duration_ms: elapsed_ms(started),
            },
            Err(err) => {
                tracing::error!(error = %err, "[Executor] Launch failed");
                ExecutionResult::launch_failed(err.to_string(), elapsed_ms(started))
            }
        };

        artifact.remove();

        tracing::info!(
            success = result.is_success(),
            duration_ms = result.duration_ms,
            "[Executor] Finished"
        );
        result
    }

    async fn run(&self, script: &Path, timeout: Duration) -> Result<RunOutcome, SandboxError> {
        let mut child = Command::new(&self.config.python_command)
            .arg(script)
            .sandboxed()
            .spawn()
            .map_err(|source| SandboxError::Spawn {
                command: self.config.python_command.clone(),
                source,
            })?;

        tracing::debug!(pid = child.id(), "[Executor] Child spawned");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let limit = self.config.max_output_bytes;

        let waited = tokio::time::timeout(timeout, async {
            tokio::join!(
                child.wait(),
                read_bounded(stdout, limit),
                read_bounded(stderr, limit)
            )
        })
        .await;

        match waited {
            Ok((Ok(status), stdout, stderr)) => Ok(RunOutcome::Exited {
                status,
                stdout,
                stderr,
            }),
            Ok((Err(err), _, _)) => {
                terminate(&mut child).await;
                Err(SandboxError::Wait(err))
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "[Executor] Deadline exceeded, killing child"
                );
                terminate(&mut child).await;
                Ok(RunOutcome::TimedOut)
            }
        }
    }
}

/// Kill and reap, so no runaway process outlives the call.
async fn terminate(child: &mut tokio::process::Child) {
    if let Err(err) = child.kill().await {
        tracing::debug!(error = %err, "[Executor] Kill reported an error (child may have exited)");
    }
}

/// Read up to `limit` bytes, then keep draining so the child never blocks on a full pipe.
async fn read_bounded<R: AsyncRead + Unpin>(stream: Option<R>, limit: usize) -> String {
    let Some(mut stream) = stream else {
        return String::new();
    };

    let mut captured = Vec::new();
    let cap = (limit as u64).saturating_add(1);
    if let Err(err) = (&mut stream).take(cap).read_to_end(&mut captured).await {
        tracing::debug!(error = %err, "[Executor] Output stream read failed");
    }
    if captured.len() > limit {
        if let Err(err) = tokio::io::copy(&mut stream, &mut tokio::io::sink()).await {
            tracing::debug!(error = %err, "[Executor] Output stream drain failed");
        }
    }

    truncate_output(captured, limit)
}

fn truncate_output(mut bytes: Vec<u8>, limit: usize) -> String {
    if bytes.len() <= limit {
        return String::from_utf8_lossy(&bytes).into_owned();
    }
    bytes.truncate(limit);
    let mut text = String::from_utf8_lossy(&bytes).into_owned();
    text.push_str(TRUNCATION_MARKER);
    text
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

//! Subprocess backend: one scoped workspace per invocation, optional compile
//! step, bounded run step, combined output capture.

use async_trait::async_trait;
use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::{Duration, Instant},
};
use tempfile::TempDir;
use tokio::{
    fs,
    io::AsyncReadExt,
    process::{Child, Command},
    time,
};
use tracing::{debug, warn};

use crate::{
    error::Error,
    executor::Backend,
    languages::{CommandSpec, ToolchainSpec},
    types::{BackendKind, ResultEnvelope},
};

/// Limits and temp-file placement shared by every process backend
#[derive(Debug, Clone)]
pub struct ProcessSettings {
    /// Bound on the compile step
    pub compile_timeout: Duration,
    /// Bound on the run step
    pub run_timeout: Duration,
    /// Parent directory for workspaces, system temp dir when unset
    pub temp_dir: Option<PathBuf>,
    /// Workspace directory name prefix
    pub temp_prefix: String,
    /// Captured output read back per step; the rest is dropped
    pub max_output_bytes: u64,
}

impl Default for ProcessSettings {
    fn default() -> Self {
        Self {
            compile_timeout: Duration::from_secs(10),
            run_timeout: Duration::from_secs(10),
            temp_dir: None,
            temp_prefix: "snippet-exec-".to_string(),
            max_output_bytes: 1024 * 1024,
        }
    }
}

/// Result of one process invocation, converted to an envelope exactly once
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Completed { output: String },
    ToolchainUnavailable { reason: String },
    CompileFailed { output: String },
    RuntimeFailed { output: String },
    TimedOut { output: String, timeout: Duration },
}

enum StepResult {
    Exited { success: bool, output: String },
    TimedOut { output: String },
    Unavailable { reason: String },
}

pub struct ProcessRunner {
    toolchain: ToolchainSpec,
    settings: ProcessSettings,
}

impl ProcessRunner {
    pub fn new(toolchain: ToolchainSpec, settings: ProcessSettings) -> Self {
        Self {
            toolchain,
            settings,
        }
    }

    pub fn toolchain(&self) -> &ToolchainSpec {
        &self.toolchain
    }

    /// Compile (when the toolchain has a compile step) and run `code`.
    ///
    /// The workspace holding the source and every derived artifact is
    /// removed when this returns, on every path.
    pub async fn execute(&self, code: &str) -> Result<ProcessOutcome, Error> {
        let workspace = self.create_workspace()?;
        let entry = self
            .toolchain
            .entry_type
            .map(|entry_type| entry_type(code))
            .unwrap_or_default();
        let source = workspace.path().join(self.toolchain.source_file_name(code));
        fs::write(&source, code).await?;
        debug!("Wrote {} source to {}", self.toolchain.language, source.display());

        let outcome = self.compile_and_run(workspace.path(), &source, &entry).await?;

        if let Err(e) = workspace.close() {
            warn!("Failed to remove execution workspace: {}", e);
        }
        Ok(outcome)
    }

    async fn compile_and_run(
        &self,
        dir: &Path,
        source: &Path,
        entry: &str,
    ) -> Result<ProcessOutcome, Error> {
        if let Some(compile) = &self.toolchain.compile {
            let timeout = self.settings.compile_timeout;
            match self.step("compile", compile, dir, source, entry, timeout).await? {
                StepResult::Unavailable { reason } => {
                    return Ok(ProcessOutcome::ToolchainUnavailable { reason })
                }
                StepResult::Exited { success: true, .. } => {}
                StepResult::Exited { output, .. } => {
                    return Ok(ProcessOutcome::CompileFailed { output })
                }
                StepResult::TimedOut { output } => {
                    let output = if output.trim().is_empty() {
                        format!("Compilation timed out after {} seconds", seconds(timeout))
                    } else {
                        output
                    };
                    return Ok(ProcessOutcome::CompileFailed { output });
                }
            }
        }

        let timeout = self.settings.run_timeout;
        let outcome = match self
            .step("run", &self.toolchain.run, dir, source, entry, timeout)
            .await?
        {
            StepResult::Unavailable { reason } => ProcessOutcome::ToolchainUnavailable { reason },
            StepResult::Exited {
                success: true,
                output,
            } => ProcessOutcome::Completed { output },
            StepResult::Exited { output, .. } => ProcessOutcome::RuntimeFailed { output },
            StepResult::TimedOut { output } => ProcessOutcome::TimedOut { output, timeout },
        };
        Ok(outcome)
    }

    /// Spawn one step with stdout and stderr sharing a capture file, so the
    /// combined stream keeps the order the child wrote it in.
    async fn step(
        &self,
        name: &str,
        command: &CommandSpec,
        dir: &Path,
        source: &Path,
        entry: &str,
        timeout: Duration,
    ) -> Result<StepResult, Error> {
        let Some(program) = command.resolve() else {
            return Ok(StepResult::Unavailable {
                reason: format!("Command not found: {}", command.candidates.join(" or ")),
            });
        };
        let args = command.render_args(source, dir, entry);
        debug!("Running {} step: {} {:?}", name, program.display(), args);

        let capture_path = dir.join(format!(".{}.out", name));
        let capture = fs::File::create(&capture_path).await?.into_std().await;
        let stderr = capture.try_clone()?;

        let mut command = Command::new(&program);
        command
            .args(&args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(capture))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true);
        // Own process group, so a timeout also reaches grandchildren
        #[cfg(unix)]
        command.process_group(0);
        let spawned = command.spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to spawn {}: {}", program.display(), e);
                return Ok(StepResult::Unavailable {
                    reason: format!("Failed to spawn process: {}", e),
                });
            }
        };

        let waited = time::timeout(timeout, child.wait()).await;
        let status = match waited {
            Ok(status) => Some(status?),
            Err(_) => {
                terminate(&mut child, name).await;
                None
            }
        };

        let output = read_capture(&capture_path, self.settings.max_output_bytes).await?;
        Ok(match status {
            Some(status) => StepResult::Exited {
                success: status.success(),
                output,
            },
            None => StepResult::TimedOut { output },
        })
    }

    fn create_workspace(&self) -> Result<TempDir, Error> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(&self.settings.temp_prefix);
        let workspace = match &self.settings.temp_dir {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        Ok(workspace)
    }

    fn envelope(&self, outcome: ProcessOutcome, elapsed: Duration) -> ResultEnvelope {
        match outcome {
            ProcessOutcome::Completed { output } => ResultEnvelope::success(output.trim(), elapsed),
            ProcessOutcome::ToolchainUnavailable { reason } => ResultEnvelope::failure(
                format!(
                    "{} execution failed: {}\n\nNote: {} must be installed on the host",
                    self.toolchain.language, reason, self.toolchain.install_hint
                ),
                elapsed,
            ),
            ProcessOutcome::CompileFailed { output } => {
                ResultEnvelope::failure(format!("Compilation failed:\n{}", output.trim()), elapsed)
            }
            ProcessOutcome::RuntimeFailed { output } => {
                ResultEnvelope::failure(output.trim(), elapsed)
            }
            ProcessOutcome::TimedOut { output, timeout } => {
                let output = output.trim();
                if output.is_empty() {
                    ResultEnvelope::failure(
                        format!("Execution timed out after {} seconds", seconds(timeout)),
                        elapsed,
                    )
                } else {
                    ResultEnvelope::failure(output, elapsed)
                }
            }
        }
    }
}

/// Kill the step's process group, then the child itself, and reap it
async fn terminate(child: &mut Child, name: &str) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::{
            sys::signal::{killpg, Signal},
            unistd::Pid,
        };
        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            debug!("Failed to kill process group of {} step: {}", name, e);
        }
    }
    if let Err(e) = child.kill().await {
        warn!("Failed to kill timed out {} step: {}", name, e);
    }
}

/// Read at most `limit` bytes of a capture file, marking any cut
async fn read_capture(path: &Path, limit: u64) -> Result<String, Error> {
    let file = fs::File::open(path).await?;
    let total = file.metadata().await?.len();
    let mut bytes = Vec::new();
    file.take(limit).read_to_end(&mut bytes).await?;

    let mut output = String::from_utf8_lossy(&bytes).into_owned();
    if total > limit {
        output.push_str(&format!("\n[output truncated after {} bytes]", limit));
    }
    Ok(output)
}

/// Whole seconds without a fraction, otherwise decimal seconds
fn seconds(timeout: Duration) -> String {
    timeout.as_secs_f64().to_string()
}

#[async_trait]
impl Backend for ProcessRunner {
    fn kind(&self) -> BackendKind {
        BackendKind::Process
    }

    async fn run(&self, code: &str) -> Result<ResultEnvelope, Error> {
        let started = Instant::now();
        let outcome = self.execute(code).await?;
        if let ProcessOutcome::ToolchainUnavailable { reason } = &outcome {
            warn!("{} toolchain unavailable: {}", self.toolchain.language, reason);
        }
        Ok(self.envelope(outcome, started.elapsed()))
    }
}

use std::future::Future;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::command::CommandLine;

/// Exit code reported when the OS gives none (the child was killed by a signal).
pub const SIGNALED_EXIT_CODE: i32 = -1;

/// Outcome of a process that ran to completion.
///
/// A non-zero `exit_code` is a normal result here; deciding whether it is a
/// failure is up to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessResult {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn has_stderr(&self) -> bool {
        !self.stderr.is_empty()
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` did not finish within {:.1}s", .after.as_secs_f64())]
    Timeout { program: String, after: Duration },

    #[error("failed while waiting for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Runs external commands on behalf of the orchestrators.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `command` to completion with stdin closed and both output streams
    /// captured in full.
    async fn run(&self, command: &CommandLine) -> Result<ProcessResult, RunError>;

    /// Run `command` attached to the current terminal and return its exit code.
    async fn run_attached(&self, command: &CommandLine) -> Result<i32, RunError>;
}

/// [`ProcessRunner`] backed by `tokio::process`.
///
/// When a timeout is configured it bounds each captured run. The child is
/// killed once its future is dropped. Attached runs are never timed out.
#[derive(Debug, Clone, Default)]
pub struct TokioRunner {
    timeout: Option<Duration>,
}

impl TokioRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    async fn bounded<F, T>(&self, program: &str, fut: F) -> Result<T, RunError>
    where
        F: Future<Output = io::Result<T>>,
    {
        let result = match self.timeout {
            Some(after) => tokio::time::timeout(after, fut).await.map_err(|_| {
                warn!(program, ?after, "process timed out");
                RunError::Timeout {
                    program: program.to_string(),
                    after,
                }
            })?,
            None => fut.await,
        };
        result.map_err(|source| RunError::Wait {
            program: program.to_string(),
            source,
        })
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(SIGNALED_EXIT_CODE)
}

fn program_name(command: &CommandLine) -> String {
    command.program().to_string_lossy().into_owned()
}

#[async_trait]
impl ProcessRunner for TokioRunner {
    async fn run(&self, command: &CommandLine) -> Result<ProcessResult, RunError> {
        let program = program_name(command);
        let mut cmd = command.to_tokio();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| RunError::Spawn {
            program: program.clone(),
            source,
        })?;
        debug!(pid = child.id(), %command, "spawned");

        let output = self.bounded(&program, child.wait_with_output()).await?;
        let result = ProcessResult {
            exit_code: exit_code(output.status),
            stdout: output.stdout,
            stderr: output.stderr,
        };
        debug!(
            program = %program,
            exit_code = result.exit_code,
            stdout_bytes = result.stdout.len(),
            stderr_bytes = result.stderr.len(),
            "process finished"
        );
        Ok(result)
    }

    async fn run_attached(&self, command: &CommandLine) -> Result<i32, RunError> {
        let program = program_name(command);
        let mut cmd = command.to_tokio();
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let mut child = cmd.spawn().map_err(|source| RunError::Spawn {
            program: program.clone(),
            source,
        })?;
        let status = child.wait().await.map_err(|source| RunError::Wait {
            program: program.clone(),
            source,
        })?;
        Ok(exit_code(status))
    }
}

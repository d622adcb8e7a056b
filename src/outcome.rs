//! Classification of external process results.
//!
//! | Process result | Outcome |
//! |----------------|---------|
//! | exit 0, empty stderr | [`Outcome::Success`] |
//! | exit 0, stderr | [`Outcome::SuccessWithWarnings`], or a failure under [`WarningPolicy::Fail`] |
//! | exit != 0 | failure carrying stderr verbatim |
//! | timed out | failure with [`FailureReason::Timeout`] |
//! | started, then lost while waiting | failure with [`FailureReason::Lost`] |
//! | could not start | [`OrchestratorError::SpawnFailure`] |

use schism_exec::{ProcessResult, RunError};
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::config::{ConfigError, WarningPolicy};
use crate::template::{OutputTarget, TemplateError};

/// Exit status of the driver itself.
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;

/// Why an external step that did start is considered failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailureReason {
    ProcessFailure { exit_code: i32, stderr: String },
    Timeout { after: Duration },
    Warnings { stderr: String },
    /// The process started but could not be waited on.
    Lost { message: String },
}

impl FailureReason {
    /// Captured stderr, when there is any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            FailureReason::ProcessFailure { stderr, .. } | FailureReason::Warnings { stderr } => {
                Some(stderr)
            }
            FailureReason::Timeout { .. } | FailureReason::Lost { .. } => None,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::ProcessFailure { exit_code, .. } => {
                write!(f, "exited with status {exit_code}")
            }
            FailureReason::Timeout { after } => {
                write!(f, "timed out after {:.1}s", after.as_secs_f64())
            }
            FailureReason::Warnings { .. } => {
                write!(f, "wrote diagnostics to stderr (--fail-on-warnings)")
            }
            FailureReason::Lost { message } => write!(f, "lost track of the process: {message}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    SpawnFailure(RunError),

    #[error("bootstrap failed: {reason}")]
    BootstrapFailed { reason: FailureReason },

    #[error("compiling {} failed: {reason}", .file.display())]
    CompileFailed { file: PathBuf, reason: FailureReason },

    #[error("evaluation failed: {reason}")]
    EvaluateFailed { reason: FailureReason },

    #[error("interactive session failed: {reason}")]
    SessionFailed { reason: FailureReason },

    #[error("failed to write {}: {source}", .path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl OrchestratorError {
    /// Process exit status this error maps to.
    pub fn exit_code(&self) -> u8 {
        match self {
            OrchestratorError::Config(_) => EXIT_CONFIG_ERROR,
            _ => EXIT_FAILURE,
        }
    }

    pub fn reason(&self) -> Option<&FailureReason> {
        match self {
            OrchestratorError::BootstrapFailed { reason }
            | OrchestratorError::CompileFailed { reason, .. }
            | OrchestratorError::EvaluateFailed { reason }
            | OrchestratorError::SessionFailed { reason } => Some(reason),
            _ => None,
        }
    }
}

/// The step a process result belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Bootstrap,
    Compile(PathBuf),
    Evaluate,
    Interactive,
}

impl Operation {
    pub fn failed(&self, reason: FailureReason) -> OrchestratorError {
        match self {
            Operation::Bootstrap => OrchestratorError::BootstrapFailed { reason },
            Operation::Compile(file) => OrchestratorError::CompileFailed {
                file: file.clone(),
                reason,
            },
            Operation::Evaluate => OrchestratorError::EvaluateFailed { reason },
            Operation::Interactive => OrchestratorError::SessionFailed { reason },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Bootstrap => "bootstrap",
            Operation::Compile(_) => "compile",
            Operation::Evaluate => "evaluate",
            Operation::Interactive => "interactive",
        }
    }

    /// Map a runner error. Only a spawn error means the program never ran;
    /// timeouts and wait errors fail the operation itself.
    pub fn run_error(&self, err: RunError) -> OrchestratorError {
        match err {
            RunError::Timeout { after, .. } => self.failed(FailureReason::Timeout { after }),
            RunError::Wait { source, .. } => self.failed(FailureReason::Lost {
                message: source.to_string(),
            }),
            spawn @ RunError::Spawn { .. } => OrchestratorError::SpawnFailure(spawn),
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    Success,
    SuccessWithWarnings,
    Failed(OrchestratorError),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn status(&self) -> &'static str {
        match self {
            Outcome::Success => "ok",
            Outcome::SuccessWithWarnings => "warnings",
            Outcome::Failed(_) => "failed",
        }
    }

    pub fn error(&self) -> Option<&OrchestratorError> {
        match self {
            Outcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

impl From<OrchestratorError> for Outcome {
    fn from(err: OrchestratorError) -> Self {
        Outcome::Failed(err)
    }
}

/// Everything known about one external step once it is over.
#[derive(Debug)]
pub struct StepReport {
    pub operation: Operation,
    pub source: Option<PathBuf>,
    pub target: Option<OutputTarget>,
    pub result: Option<ProcessResult>,
    pub outcome: Outcome,
}

impl StepReport {
    pub fn new(operation: Operation) -> Self {
        let source = match &operation {
            Operation::Compile(file) => Some(file.clone()),
            _ => None,
        };
        Self {
            operation,
            source,
            target: None,
            result: None,
            outcome: Outcome::Success,
        }
    }

    pub fn fail(mut self, err: OrchestratorError) -> Self {
        self.outcome = Outcome::Failed(err);
        self
    }

    /// Bytes destined for the driver's own stdout, if this step produced any.
    pub fn stdout_payload(&self) -> Option<&[u8]> {
        match (&self.target, &self.result) {
            (Some(OutputTarget::Stdout), Some(result)) if !self.outcome.is_failure() => {
                Some(result.stdout.as_slice())
            }
            _ => None,
        }
    }
}

/// Classify a completed process.
pub fn classify(op: &Operation, result: &ProcessResult, policy: WarningPolicy) -> Outcome {
    if !result.success() {
        return Outcome::Failed(op.failed(FailureReason::ProcessFailure {
            exit_code: result.exit_code,
            stderr: result.stderr_lossy(),
        }));
    }
    if !result.has_stderr() {
        return Outcome::Success;
    }
    match policy {
        WarningPolicy::Surface => Outcome::SuccessWithWarnings,
        WarningPolicy::Fail => Outcome::Failed(op.failed(FailureReason::Warnings {
            stderr: result.stderr_lossy(),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(exit_code: i32, stderr: &str) -> ProcessResult {
        ProcessResult {
            exit_code,
            stdout: b"\0asm".to_vec(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_clean_exit_is_success() {
        let outcome = classify(
            &Operation::Bootstrap,
            &result(0, ""),
            WarningPolicy::Surface,
        );
        assert!(matches!(outcome, Outcome::Success));
        assert_eq!(outcome.status(), "ok");
    }

    #[test]
    fn test_stderr_on_success_is_warning_by_default() {
        let outcome = classify(
            &Operation::Bootstrap,
            &result(0, ";;; note: auto-compilation is enabled"),
            WarningPolicy::Surface,
        );
        assert!(matches!(outcome, Outcome::SuccessWithWarnings));
        assert!(!outcome.is_failure());
    }

    #[test]
    fn test_stderr_on_success_fails_under_strict_policy() {
        let outcome = classify(
            &Operation::Compile(PathBuf::from("a.ss")),
            &result(0, "warning: unused"),
            WarningPolicy::Fail,
        );
        match outcome {
            Outcome::Failed(OrchestratorError::CompileFailed { file, reason }) => {
                assert_eq!(file, PathBuf::from("a.ss"));
                assert_eq!(
                    reason,
                    FailureReason::Warnings {
                        stderr: "warning: unused".to_string()
                    }
                );
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_nonzero_exit_carries_stderr_verbatim() {
        let stderr = "ERROR: In procedure car:\n  Wrong type (expecting pair): ()\n";
        let outcome = classify(&Operation::Bootstrap, &result(1, stderr), WarningPolicy::Surface);
        let err = outcome.error().expect("failure");
        assert_eq!(err.exit_code(), EXIT_FAILURE);
        assert_eq!(err.reason().and_then(FailureReason::stderr), Some(stderr));
        assert_eq!(err.to_string(), "bootstrap failed: exited with status 1");
    }

    #[test]
    fn test_timeout_maps_to_operation_failure() {
        let err = Operation::Evaluate.run_error(RunError::Timeout {
            program: "node".to_string(),
            after: Duration::from_secs(3),
        });
        assert!(matches!(
            err,
            OrchestratorError::EvaluateFailed {
                reason: FailureReason::Timeout { .. }
            }
        ));
        assert_eq!(err.to_string(), "evaluation failed: timed out after 3.0s");
    }

    #[test]
    fn test_spawn_error_is_spawn_failure() {
        let err = Operation::Bootstrap.run_error(RunError::Spawn {
            program: "guile-2.2".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        });
        assert!(matches!(err, OrchestratorError::SpawnFailure(_)));
        assert_eq!(err.exit_code(), EXIT_FAILURE);
    }

    #[test]
    fn test_wait_error_fails_the_operation() {
        let op = Operation::Compile(PathBuf::from("a.ss"));
        let err = op.run_error(RunError::Wait {
            program: "node".to_string(),
            source: io::Error::new(io::ErrorKind::Interrupted, "interrupted"),
        });
        match &err {
            OrchestratorError::CompileFailed { file, reason } => {
                assert_eq!(file, &PathBuf::from("a.ss"));
                assert_eq!(
                    reason,
                    &FailureReason::Lost {
                        message: "interrupted".to_string()
                    }
                );
                assert_eq!(reason.stderr(), None);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "compiling a.ss failed: lost track of the process: interrupted"
        );
    }

    #[test]
    fn test_stdout_payload_only_for_successful_stdout_steps() {
        let mut report = StepReport::new(Operation::Evaluate);
        report.target = Some(OutputTarget::Stdout);
        report.result = Some(result(0, ""));
        assert_eq!(report.stdout_payload(), Some(&b"\0asm"[..]));

        let report = report.fail(OrchestratorError::EvaluateFailed {
            reason: FailureReason::Timeout {
                after: Duration::from_secs(1),
            },
        });
        assert_eq!(report.stdout_payload(), None);

        let mut report = StepReport::new(Operation::Compile(PathBuf::from("a.ss")));
        report.target = Some(OutputTarget::File(PathBuf::from("a.wasm")));
        report.result = Some(result(0, ""));
        assert_eq!(report.stdout_payload(), None);
        assert_eq!(report.source, Some(PathBuf::from("a.ss")));
    }

    #[test]
    fn test_config_errors_exit_with_two() {
        let err = OrchestratorError::from(ConfigError::MissingCompilerImage);
        assert_eq!(err.exit_code(), EXIT_CONFIG_ERROR);
    }
}

//! Runs one invocation end to end: pick the mode, then hand off to the
//! matching orchestrator.

use schism_exec::ProcessRunner;
use tracing::debug;

use crate::bootstrap::bootstrap;
use crate::compile::{compile, evaluate};
use crate::config::{ConfigError, Configuration};
use crate::mode::{self, Mode};
use crate::outcome::{StepReport, EXIT_SUCCESS};
use crate::session::interactive;

/// The mode that ran and one report per external step, in execution order.
#[derive(Debug)]
pub struct RunSummary {
    pub mode: Mode,
    pub steps: Vec<StepReport>,
}

impl RunSummary {
    /// Highest exit status among the failed steps, or success.
    pub fn exit_code(&self) -> u8 {
        self.steps
            .iter()
            .filter_map(|step| step.outcome.error())
            .map(|err| err.exit_code())
            .max()
            .unwrap_or(EXIT_SUCCESS)
    }

    pub fn failures(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| step.outcome.is_failure())
            .count()
    }

    /// Stdout-bound bytes of every step, in step order.
    pub fn stdout_payloads(&self) -> impl Iterator<Item = &[u8]> {
        self.steps.iter().filter_map(StepReport::stdout_payload)
    }
}

/// `Err` means nothing was launched.
pub async fn run(
    config: &Configuration,
    runner: &dyn ProcessRunner,
) -> Result<RunSummary, ConfigError> {
    let mode = mode::resolve(config)?;
    debug!(%mode, "resolved mode");

    let steps = match mode {
        Mode::Bootstrap => vec![bootstrap(config, runner).await?],
        Mode::CompileWithImage { evaluate: forms } => {
            // Checked up front so a missing image never leaves a partial batch.
            config.require_compiler_image()?;
            let mut steps = compile(config, runner).await?;
            if forms {
                steps.push(evaluate(config, runner).await?);
            }
            steps
        }
        Mode::Interactive => vec![interactive(config, runner).await?],
    };

    Ok(RunSummary { mode, steps })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{Operation, EXIT_FAILURE};
    use crate::testing::{config_in, exited, last_arg, ok, ScriptedRunner};
    use schism_exec::CommandLine;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn verb(cmd: &CommandLine) -> String {
        cmd.get_args()
            .get(1)
            .map(|arg| arg.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_bootstrap_mode_runs_only_bootstrap() {
        let config = Configuration {
            bootstrap_source: Some(PathBuf::from("/src/compiler.ss")),
            output_template: "-".to_string(),
            input_files: vec![PathBuf::from("ignored.ss")],
            evaluate_forms: vec!["(ignored)".to_string()],
            ..config_in(Path::new("/work"))
        };
        let runner = ScriptedRunner::succeeding(b"\0asm");

        let summary = run(&config, &runner).await.unwrap();
        assert_eq!(summary.mode, Mode::Bootstrap);
        assert_eq!(summary.steps.len(), 1);
        assert_eq!(runner.calls()[0].program(), "guile-2.2");
        assert_eq!(summary.exit_code(), EXIT_SUCCESS);
    }

    #[tokio::test]
    async fn test_files_then_forms() {
        let dir = TempDir::new().unwrap();
        let config = Configuration {
            compiler_image: Some(PathBuf::from("/img/compiler1.wasm")),
            output_template: "-".to_string(),
            input_files: vec![PathBuf::from("a.ss"), PathBuf::from("b.ss")],
            evaluate_forms: vec!["(+ 1 2)".to_string()],
            ..config_in(dir.path())
        };
        let runner = ScriptedRunner::new(|cmd| Ok(ok(last_arg(cmd).as_bytes())));

        let summary = run(&config, &runner).await.unwrap();
        assert_eq!(summary.mode, Mode::CompileWithImage { evaluate: true });
        let ops: Vec<_> = summary.steps.iter().map(|s| s.operation.clone()).collect();
        assert_eq!(
            ops,
            vec![
                Operation::Compile(PathBuf::from("a.ss")),
                Operation::Compile(PathBuf::from("b.ss")),
                Operation::Evaluate,
            ]
        );
        let verbs: Vec<_> = runner.calls().iter().map(verb).collect();
        assert_eq!(verbs, vec!["compile", "compile", "eval"]);

        let payloads: Vec<_> = summary.stdout_payloads().collect();
        assert_eq!(payloads, vec![&b"a.ss"[..], &b"b.ss"[..], &b"(+ 1 2)"[..]]);
    }

    #[tokio::test]
    async fn test_any_failure_exits_one() {
        let dir = TempDir::new().unwrap();
        let config = Configuration {
            compiler_image: Some(PathBuf::from("/img/compiler1.wasm")),
            output_template: "-".to_string(),
            input_files: vec![PathBuf::from("a.ss"), PathBuf::from("b.ss")],
            ..config_in(dir.path())
        };
        let runner = ScriptedRunner::new(|cmd| {
            if last_arg(cmd) == "a.ss" {
                Ok(exited(1, "a.ss: syntax error\n"))
            } else {
                Ok(ok(b"\0asm"))
            }
        });

        let summary = run(&config, &runner).await.unwrap();
        assert_eq!(summary.failures(), 1);
        assert_eq!(summary.exit_code(), EXIT_FAILURE);
        assert_eq!(summary.stdout_payloads().count(), 1);
    }

    #[tokio::test]
    async fn test_compile_mode_without_image_launches_nothing() {
        let config = Configuration {
            input_files: vec![PathBuf::from("a.ss")],
            ..config_in(Path::new("/work"))
        };
        let runner = ScriptedRunner::succeeding(b"");
        let err = run(&config, &runner).await.unwrap_err();
        assert!(matches!(err, ConfigError::MissingCompilerImage));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_conflict_launches_nothing() {
        let config = Configuration {
            bootstrap_source: Some(PathBuf::from("/src/compiler.ss")),
            compiler_image: Some(PathBuf::from("/img/compiler1.wasm")),
            ..config_in(Path::new("/work"))
        };
        let runner = ScriptedRunner::succeeding(b"");
        let err = run(&config, &runner).await.unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingOptions { .. }));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_default_mode_is_interactive() {
        let config = Configuration {
            compiler_image: Some(PathBuf::from("/img/compiler1.wasm")),
            ..config_in(Path::new("/work"))
        };
        let runner = ScriptedRunner::succeeding(b"");
        let summary = run(&config, &runner).await.unwrap();
        assert_eq!(summary.mode, Mode::Interactive);
        assert_eq!(verb(&runner.calls()[0]), "repl");
    }
}

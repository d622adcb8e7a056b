//! Compiling source files, and evaluating inline forms, with a compiler image.
//!
//! Each file is compiled independently: a failure is recorded in that file's
//! [`StepReport`] and the batch carries on. Up to `jobs` compiles run at once
//! but reports always come back in input order.

use futures::stream::{self, StreamExt};
use schism_exec::ProcessRunner;
use std::path::Path;
use tracing::{debug, info};

use crate::config::{ConfigError, Configuration};
use crate::outcome::{classify, OrchestratorError, Operation, Outcome, StepReport};
use crate::template::{self, OutputTarget};
use crate::toolchain::LauncherVerb;

/// Compile every input file.
///
/// Returns `Err` only when no compiler image is configured, before anything is
/// launched.
pub async fn compile(
    config: &Configuration,
    runner: &dyn ProcessRunner,
) -> Result<Vec<StepReport>, ConfigError> {
    let image = config.require_compiler_image()?;
    debug!(
        files = config.input_files.len(),
        jobs = config.jobs,
        "compiling batch"
    );

    let reports = stream::iter(config.input_files.iter())
        .map(|file| compile_one(config, image, runner, file))
        .buffered(config.jobs)
        .collect::<Vec<_>>()
        .await;
    Ok(reports)
}

async fn compile_one(
    config: &Configuration,
    image: &Path,
    runner: &dyn ProcessRunner,
    file: &Path,
) -> StepReport {
    let op = Operation::Compile(file.to_path_buf());
    let mut report = StepReport::new(op.clone());

    let target = match template::output_for(&config.output_template, file) {
        Ok(target) => target,
        Err(err) => return report.fail(err.into()),
    };
    report.target = Some(target.clone());

    let command = config
        .toolchain
        .runtime_command(config.runtime, LauncherVerb::Compile, image)
        .arg(file);
    info!(%command, "compiling {}", file.display());

    let result = match runner.run(&command).await {
        Ok(result) => result,
        Err(err) => return report.fail(op.run_error(err)),
    };

    let mut outcome = classify(&op, &result, config.warnings);
    if !outcome.is_failure() {
        if let OutputTarget::File(path) = &target {
            if let Err(err) = write_output(path, &result.stdout).await {
                outcome = Outcome::Failed(err);
            }
        }
    }
    report.outcome = outcome;
    report.result = Some(result);
    report
}

async fn write_output(path: &Path, bytes: &[u8]) -> Result<(), OrchestratorError> {
    let wrap = |source| OrchestratorError::OutputWrite {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(wrap)?;
    }
    tokio::fs::write(path, bytes).await.map_err(wrap)?;
    debug!(path = %path.display(), bytes = bytes.len(), "wrote module");
    Ok(())
}

/// Evaluate the `--evaluate` forms with the compiler image, in order, in a
/// single runtime invocation. Output always goes to stdout.
pub async fn evaluate(
    config: &Configuration,
    runner: &dyn ProcessRunner,
) -> Result<StepReport, ConfigError> {
    let image = config.require_compiler_image()?;
    let op = Operation::Evaluate;
    let mut report = StepReport::new(op.clone());
    report.target = Some(OutputTarget::Stdout);

    let command = config
        .toolchain
        .runtime_command(config.runtime, LauncherVerb::Eval, image)
        .args(&config.evaluate_forms);
    info!(%command, forms = config.evaluate_forms.len(), "evaluating");

    let result = match runner.run(&command).await {
        Ok(result) => result,
        Err(err) => return Ok(report.fail(op.run_error(err))),
    };
    report.outcome = classify(&op, &result, config.warnings);
    report.result = Some(result);
    Ok(report)
}

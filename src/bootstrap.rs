//! Bootstrapping a compiler image with the foreign host toolchain.

use schism_exec::ProcessRunner;
use tracing::info;

use crate::config::{ConfigError, Configuration};
use crate::outcome::{classify, Operation, StepReport};
use crate::template;

/// Run `<host> <shim> <output> <source>` for the configured bootstrap source.
///
/// With the stdout template the shim receives `-` as its output argument; its
/// stdout then ends up in the report for the caller to forward. Only a missing
/// bootstrap source is an `Err`; every other failure is recorded in the report.
pub async fn bootstrap(
    config: &Configuration,
    runner: &dyn ProcessRunner,
) -> Result<StepReport, ConfigError> {
    let source = config.require_bootstrap_source()?;
    let op = Operation::Bootstrap;
    let mut report = StepReport::new(op.clone());
    report.source = Some(source.to_path_buf());

    let target = match template::output_for(&config.output_template, source) {
        Ok(target) => target,
        Err(err) => return Ok(report.fail(err.into())),
    };
    report.target = Some(target.clone());

    let command = config.toolchain.bootstrap_command(&target, source);
    info!(%command, "bootstrapping compiler");

    let result = match runner.run(&command).await {
        Ok(result) => result,
        Err(err) => return Ok(report.fail(op.run_error(err))),
    };
    if !target.is_stdout() && !result.stdout.is_empty() {
        info!(stdout = %result.stdout_lossy().trim_end(), "bootstrap output");
    }

    report.outcome = classify(&op, &result, config.warnings);
    report.result = Some(result);
    Ok(report)
}

//! Interactive sessions. The REPL itself lives in the runtime launcher; the
//! driver only starts it on the current terminal and waits for it to exit.

use schism_exec::ProcessRunner;
use tracing::info;

use crate::config::{ConfigError, Configuration};
use crate::outcome::{FailureReason, Operation, StepReport};
use crate::toolchain::LauncherVerb;

pub async fn interactive(
    config: &Configuration,
    runner: &dyn ProcessRunner,
) -> Result<StepReport, ConfigError> {
    let image = config.require_compiler_image()?;
    let op = Operation::Interactive;
    let report = StepReport::new(op.clone());

    let command = config
        .toolchain
        .runtime_command(config.runtime, LauncherVerb::Repl, image);
    info!(%command, "starting interactive session");

    let report = match runner.run_attached(&command).await {
        Ok(0) => report,
        Ok(exit_code) => report.fail(op.failed(FailureReason::ProcessFailure {
            exit_code,
            stderr: String::new(),
        })),
        Err(err) => report.fail(op.run_error(err)),
    };
    Ok(report)
}

//! `schism` command-line driver.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use schism::cli::Cli;
use schism::config::ConfigError;
use schism::driver;
use schism::outcome::{EXIT_CONFIG_ERROR, EXIT_FAILURE};
use schism::report;
use schism_exec::TokioRunner;

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli, json: bool, color: bool) -> Result<u8> {
    let config = cli.into_configuration()?;
    debug!(config = %serde_json::to_string(&config)?, "configuration");

    let runner = TokioRunner::with_timeout(config.timeout);
    let summary = driver::run(&config, &runner).await?;

    if json {
        println!("{}", report::format_summary_json(&summary));
    } else {
        report::write_payloads(&summary, &mut std::io::stdout().lock())
            .context("failed to write to stdout")?;
        eprint!("{}", report::format_summary(&summary, color));
    }
    Ok(summary.exit_code())
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<ConfigError>().is_some() {
        EXIT_CONFIG_ERROR
    } else {
        EXIT_FAILURE
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level());

    let json = cli.json;
    let color = std::io::stderr().is_terminal();

    match run(cli, json, color).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            let out = report::format_error(&err, json, color);
            if json {
                println!("{out}");
            } else {
                eprint!("{out}");
            }
            ExitCode::from(exit_code_for(&err))
        }
    }
}

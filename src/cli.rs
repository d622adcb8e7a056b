//! Command-line surface of the `schism` driver.
//!
//! Every option can also come from a `SCHISM_*` environment variable; an
//! explicit flag always wins over the environment.

use clap::builder::FalseyValueParser;
use clap::{ArgAction, Parser};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{absolutize, ConfigError, Configuration, WarningPolicy};
use crate::template::DEFAULT_TEMPLATE;
use crate::toolchain::{default_root, RuntimeKind, Toolchain};

#[derive(Parser, Debug)]
#[command(
    name = "schism",
    author,
    version,
    about = "Driver for the schism Scheme-to-WebAssembly compiler",
    long_about = "Bootstraps the schism compiler with a host Scheme, compiles source files \
                  with an existing compiler image, evaluates inline forms, or starts a REPL.\n\n\
                  With no files and no --evaluate forms an interactive session is started."
)]
pub struct Cli {
    /// Bootstrap a compiler image from PATH (default: <root>/lib/compiler.ss)
    #[arg(
        short = 'b',
        long,
        value_name = "PATH",
        num_args = 0..=1,
        env = "SCHISM_BOOTSTRAP"
    )]
    pub bootstrap: Option<Option<PathBuf>>,

    /// Compiler image used to compile, evaluate, and run the REPL
    #[arg(short = 'I', long, value_name = "PATH", env = "SCHISM_COMPILER_IMAGE")]
    pub compiler_image: Option<PathBuf>,

    /// Use <root>/build/lib/compiler<N>.wasm when no compiler image is given
    #[arg(long, value_name = "N", env = "SCHISM_STAGE")]
    pub stage: Option<u32>,

    /// Prefer the REPL when nothing else was requested
    #[arg(
        short = 'i',
        long,
        env = "SCHISM_INTERACTIVE",
        value_parser = FalseyValueParser::new()
    )]
    pub interactive: bool,

    /// Evaluate FORM with the compiler image (repeatable, runs in order)
    #[arg(short = 'e', long = "evaluate", value_name = "FORM")]
    pub evaluate: Vec<String>,

    /// Output path template; `{}` is replaced by the source stem, `-` means stdout
    #[arg(
        short = 'o',
        long,
        value_name = "TEMPLATE",
        default_value = DEFAULT_TEMPLATE,
        env = "SCHISM_OUTPUT_TEMPLATE"
    )]
    pub output_template: String,

    /// Runtime used to run compiler images
    #[arg(
        short = 'r',
        long,
        value_enum,
        default_value_t = RuntimeKind::Node,
        env = "SCHISM_RUNTIME"
    )]
    pub runtime: RuntimeKind,

    /// Number of files compiled concurrently
    #[arg(short = 'j', long, default_value_t = 1, env = "SCHISM_JOBS")]
    pub jobs: usize,

    /// Kill any external process still running after this many seconds
    #[arg(long, value_name = "SECS", env = "SCHISM_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Treat diagnostics on stderr from a successful process as a failure
    #[arg(
        long,
        env = "SCHISM_FAIL_ON_WARNINGS",
        value_parser = FalseyValueParser::new()
    )]
    pub fail_on_warnings: bool,

    /// schism installation root (default: the directory above the executable's)
    #[arg(long, value_name = "DIR", env = "SCHISM_ROOT")]
    pub root: Option<PathBuf>,

    /// Host Scheme used for bootstrapping
    #[arg(long, value_name = "PROGRAM", env = "SCHISM_GUILE", hide = true)]
    pub guile: Option<PathBuf>,

    /// Node executable
    #[arg(long, value_name = "PROGRAM", env = "SCHISM_NODE", hide = true)]
    pub node: Option<PathBuf>,

    /// Runtime launcher script (default: <root>/lib/schism-node.mjs)
    #[arg(long, value_name = "PATH", env = "SCHISM_LAUNCHER", hide = true)]
    pub launcher: Option<PathBuf>,

    /// Print a JSON report on stdout instead of the human-readable one
    #[arg(long)]
    pub json: bool,

    /// More logging (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Source files to compile
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

impl Cli {
    /// Default log filter for the `-v` count.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    pub fn into_configuration(self) -> Result<Configuration, ConfigError> {
        let cwd = std::env::current_dir().map_err(ConfigError::CurrentDir)?;
        self.into_configuration_in(&cwd)
    }

    /// Build the validated configuration, resolving relative paths against `cwd`.
    pub fn into_configuration_in(self, cwd: &Path) -> Result<Configuration, ConfigError> {
        let root = self
            .root
            .map(|root| absolutize(cwd, &root))
            .unwrap_or_else(default_root);
        let toolchain = Toolchain::from_root(root)
            .with_host(self.guile)
            .with_node(self.node)
            .with_launcher(self.launcher.map(|launcher| absolutize(cwd, &launcher)));

        let warnings = if self.fail_on_warnings {
            WarningPolicy::Fail
        } else {
            WarningPolicy::Surface
        };

        Configuration::builder()
            .toolchain(toolchain)
            .bootstrap(self.bootstrap)
            .compiler_image(self.compiler_image)
            .stage(self.stage)
            .interactive(self.interactive)
            .evaluate_forms(self.evaluate)
            .output_template(self.output_template)
            .runtime(self.runtime)
            .input_files(self.files)
            .jobs(self.jobs)
            .timeout(self.timeout_secs.map(Duration::from_secs))
            .warnings(warnings)
            .build(cwd)
    }
}

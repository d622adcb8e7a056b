//! Per-invocation configuration.
//!
//! Options arrive from flags and `SCHISM_*` environment variables (flags win).
//! [`ConfigBuilder::build`] is the single place where they are checked; once a
//! [`Configuration`] exists it is never modified.

use serde::Serialize;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::template::{self, TemplateError, DEFAULT_TEMPLATE};
use crate::toolchain::{default_root, RuntimeKind, Toolchain};

/// Prefix shared by every environment variable the driver reads.
pub const ENV_PREFIX: &str = "SCHISM_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "conflicting options: --bootstrap ({}) and --compiler-image ({}) are mutually exclusive",
        .bootstrap.display(),
        .compiler_image.display()
    )]
    ConflictingOptions {
        bootstrap: PathBuf,
        compiler_image: PathBuf,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("--jobs must be at least 1")]
    InvalidJobs,

    #[error(
        "no compiler image configured: pass --compiler-image or --stage, or set SCHISM_COMPILER_IMAGE"
    )]
    MissingCompilerImage,

    #[error("no bootstrap source configured: pass --bootstrap or set SCHISM_BOOTSTRAP")]
    MissingBootstrapSource,

    #[error("failed to determine the current directory: {0}")]
    CurrentDir(#[source] io::Error),
}

/// How a successful process that still wrote to stderr is classified.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningPolicy {
    /// Show stderr, keep the operation successful.
    #[default]
    Surface,
    /// Treat any stderr output as a failure.
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Configuration {
    pub bootstrap_source: Option<PathBuf>,
    pub compiler_image: Option<PathBuf>,
    pub interactive_forced: bool,
    pub evaluate_forms: Vec<String>,
    pub output_template: String,
    pub runtime: RuntimeKind,
    pub input_files: Vec<PathBuf>,
    pub jobs: usize,
    pub timeout: Option<Duration>,
    pub warnings: WarningPolicy,
    pub toolchain: Toolchain,
}

impl Configuration {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn require_compiler_image(&self) -> Result<&Path, ConfigError> {
        self.compiler_image
            .as_deref()
            .ok_or(ConfigError::MissingCompilerImage)
    }

    pub fn require_bootstrap_source(&self) -> Result<&Path, ConfigError> {
        self.bootstrap_source
            .as_deref()
            .ok_or(ConfigError::MissingBootstrapSource)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    bootstrap: Option<Option<PathBuf>>,
    compiler_image: Option<PathBuf>,
    stage: Option<u32>,
    interactive_forced: bool,
    evaluate_forms: Vec<String>,
    output_template: Option<String>,
    runtime: RuntimeKind,
    input_files: Vec<PathBuf>,
    jobs: Option<usize>,
    timeout: Option<Duration>,
    warnings: WarningPolicy,
    toolchain: Option<Toolchain>,
}

impl ConfigBuilder {
    /// `Some(None)` requests a bootstrap of the default compiler source.
    pub fn bootstrap(mut self, source: Option<Option<PathBuf>>) -> Self {
        self.bootstrap = source;
        self
    }

    pub fn compiler_image(mut self, image: Option<PathBuf>) -> Self {
        self.compiler_image = image;
        self
    }

    /// Use the stage `N` image under the root when no image is given explicitly.
    pub fn stage(mut self, stage: Option<u32>) -> Self {
        self.stage = stage;
        self
    }

    pub fn interactive(mut self, forced: bool) -> Self {
        self.interactive_forced = forced;
        self
    }

    pub fn evaluate_forms(mut self, forms: Vec<String>) -> Self {
        self.evaluate_forms = forms;
        self
    }

    pub fn output_template(mut self, template: impl Into<String>) -> Self {
        self.output_template = Some(template.into());
        self
    }

    pub fn runtime(mut self, runtime: RuntimeKind) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn input_files(mut self, files: Vec<PathBuf>) -> Self {
        self.input_files = files;
        self
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn warnings(mut self, policy: WarningPolicy) -> Self {
        self.warnings = policy;
        self
    }

    pub fn toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchain = Some(toolchain);
        self
    }

    /// Validate and resolve relative bootstrap/image paths against `cwd`.
    pub fn build(self, cwd: &Path) -> Result<Configuration, ConfigError> {
        let toolchain = self
            .toolchain
            .unwrap_or_else(|| Toolchain::from_root(default_root()));

        let bootstrap_source = self.bootstrap.map(|source| {
            let source = source.unwrap_or_else(|| toolchain.default_compiler_source());
            absolutize(cwd, &source)
        });
        let mut compiler_image = self.compiler_image.map(|image| absolutize(cwd, &image));

        if let (Some(bootstrap), Some(image)) = (&bootstrap_source, &compiler_image) {
            return Err(ConfigError::ConflictingOptions {
                bootstrap: bootstrap.clone(),
                compiler_image: image.clone(),
            });
        }
        if compiler_image.is_none() && bootstrap_source.is_none() {
            compiler_image = self.stage.map(|stage| toolchain.staged_image(stage));
        }

        let output_template = self
            .output_template
            .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string());
        template::validate(&output_template)?;

        let jobs = self.jobs.unwrap_or(1);
        if jobs == 0 {
            return Err(ConfigError::InvalidJobs);
        }

        Ok(Configuration {
            bootstrap_source,
            compiler_image,
            interactive_forced: self.interactive_forced,
            evaluate_forms: self.evaluate_forms,
            output_template,
            runtime: self.runtime,
            input_files: self.input_files,
            jobs,
            timeout: self.timeout,
            warnings: self.warnings,
            toolchain,
        })
    }
}

/// Join `path` onto `base` unless it is already absolute, then drop `.` and
/// fold `..` lexically.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

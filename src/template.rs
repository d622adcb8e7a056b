//! Output path templates.
//!
//! A template is either `-` (write to stdout) or a string containing `{}`. The
//! stem of the source file replaces the first `{}` by plain string
//! substitution, so `./build/lib/{}0.wasm` with stem `compiler` becomes
//! `./build/lib/compiler0.wasm`.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Placeholder replaced by the source stem.
pub const PLACEHOLDER: &str = "{}";

/// Template value meaning "write to standard output".
pub const STDOUT_TEMPLATE: &str = "-";

/// Template used when none is configured.
pub const DEFAULT_TEMPLATE: &str = "./{}.wasm";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("invalid output template `{0}`: must contain \"{{}}\" or be \"-\"")]
    InvalidTemplate(String),

    #[error("invalid source path `{}`: no file name to derive an output name from", .0.display())]
    InvalidSourcePath(PathBuf),
}

/// Where a produced artifact goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum OutputTarget {
    File(PathBuf),
    Stdout,
}

impl OutputTarget {
    pub fn is_stdout(&self) -> bool {
        matches!(self, OutputTarget::Stdout)
    }

    /// The argument handed to external tools that take an output path.
    pub fn as_arg(&self) -> PathBuf {
        match self {
            OutputTarget::File(path) => path.clone(),
            OutputTarget::Stdout => PathBuf::from(STDOUT_TEMPLATE),
        }
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::File(path) => write!(f, "{}", path.display()),
            OutputTarget::Stdout => write!(f, "<stdout>"),
        }
    }
}

/// Check that `template` can ever name an output.
pub fn validate(template: &str) -> Result<(), TemplateError> {
    if template == STDOUT_TEMPLATE || template.contains(PLACEHOLDER) {
        Ok(())
    } else {
        Err(TemplateError::InvalidTemplate(template.to_string()))
    }
}

/// Substitute `stem` into `template`.
pub fn resolve(template: &str, stem: &str) -> Result<OutputTarget, TemplateError> {
    if template == STDOUT_TEMPLATE {
        return Ok(OutputTarget::Stdout);
    }
    validate(template)?;
    Ok(OutputTarget::File(PathBuf::from(
        template.replacen(PLACEHOLDER, stem, 1),
    )))
}

/// File name of `path` without its directory and final extension.
pub fn stem(path: &Path) -> Result<String, TemplateError> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| TemplateError::InvalidSourcePath(path.to_path_buf()))
}

/// [`stem`] followed by [`resolve`].
pub fn output_for(template: &str, source: &Path) -> Result<OutputTarget, TemplateError> {
    resolve(template, &stem(source)?)
}

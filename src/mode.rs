//! Operating mode selection.
//!
//! Precedence, highest first:
//!
//! 1. a bootstrap source selects [`Mode::Bootstrap`] and inhibits everything else
//! 2. `--evaluate` forms select [`Mode::CompileWithImage`] with evaluation (no REPL)
//! 3. input files select [`Mode::CompileWithImage`]
//! 4. `--interactive` selects [`Mode::Interactive`]; it never overrides 1-3
//! 5. otherwise [`Mode::Interactive`]

use serde::Serialize;
use std::fmt;

use crate::config::{ConfigError, Configuration};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Mode {
    Bootstrap,
    /// Compile `input_files` with the compiler image. With `evaluate` set the
    /// `--evaluate` forms are run as well.
    CompileWithImage { evaluate: bool },
    Interactive,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Bootstrap => write!(f, "bootstrap"),
            Mode::CompileWithImage { evaluate: false } => write!(f, "compile"),
            Mode::CompileWithImage { evaluate: true } => write!(f, "evaluate"),
            Mode::Interactive => write!(f, "interactive"),
        }
    }
}

/// Pick the single mode for this invocation.
///
/// Bootstrap and compiler image are checked again here because the two may
/// come from different sources (a flag and an environment variable).
pub fn resolve(config: &Configuration) -> Result<Mode, ConfigError> {
    if let (Some(bootstrap), Some(image)) = (&config.bootstrap_source, &config.compiler_image) {
        return Err(ConfigError::ConflictingOptions {
            bootstrap: bootstrap.clone(),
            compiler_image: image.clone(),
        });
    }

    if config.bootstrap_source.is_some() {
        return Ok(Mode::Bootstrap);
    }
    if !config.evaluate_forms.is_empty() {
        return Ok(Mode::CompileWithImage { evaluate: true });
    }
    if !config.input_files.is_empty() {
        return Ok(Mode::CompileWithImage { evaluate: false });
    }
    // Rules 4 and 5 agree; the flag only matters when nothing else applies.
    Ok(Mode::Interactive)
}

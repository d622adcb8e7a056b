//! Locations of the external programs the driver delegates to, and the command
//! lines used to invoke them.
//!
//! Layout under the schism root:
//!
//! ```text
//! <root>/lib/compiler.ss                 default bootstrap source
//! <root>/lib/bootstrap-from-guile.scm    bootstrap shim run by the host toolchain
//! <root>/lib/schism-node.mjs             runtime launcher (compile | eval | repl)
//! <root>/build/lib/compiler<N>.wasm      stage N compiler image
//! ```

use clap::ValueEnum;
use schism_exec::CommandLine;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::template::OutputTarget;

pub const DEFAULT_HOST: &str = "guile-2.2";
pub const DEFAULT_NODE: &str = "node";

const LIB_DIR: &str = "lib";
const COMPILER_SOURCE: &str = "compiler.ss";
const BOOTSTRAP_SHIM: &str = "bootstrap-from-guile.scm";
const NODE_LAUNCHER: &str = "schism-node.mjs";

/// Execution backend that hosts a compiler image.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    #[default]
    Node,
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeKind::Node => write!(f, "node"),
        }
    }
}

/// What the launcher is asked to do with the compiler image.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LauncherVerb {
    Compile,
    Eval,
    Repl,
}

impl LauncherVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            LauncherVerb::Compile => "compile",
            LauncherVerb::Eval => "eval",
            LauncherVerb::Repl => "repl",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toolchain {
    pub root: PathBuf,
    /// Foreign host toolchain used for bootstrapping (Guile).
    pub host: PathBuf,
    pub shim: PathBuf,
    pub node: PathBuf,
    pub launcher: PathBuf,
}

impl Toolchain {
    /// Standard layout under `root` with default executables.
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let lib = root.join(LIB_DIR);
        Self {
            host: PathBuf::from(DEFAULT_HOST),
            shim: lib.join(BOOTSTRAP_SHIM),
            node: PathBuf::from(DEFAULT_NODE),
            launcher: lib.join(NODE_LAUNCHER),
            root,
        }
    }

    pub fn with_host(mut self, host: Option<PathBuf>) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        self
    }

    pub fn with_node(mut self, node: Option<PathBuf>) -> Self {
        if let Some(node) = node {
            self.node = node;
        }
        self
    }

    pub fn with_launcher(mut self, launcher: Option<PathBuf>) -> Self {
        if let Some(launcher) = launcher {
            self.launcher = launcher;
        }
        self
    }

    pub fn default_compiler_source(&self) -> PathBuf {
        self.root.join(LIB_DIR).join(COMPILER_SOURCE)
    }

    pub fn staged_image(&self, stage: u32) -> PathBuf {
        self.root
            .join("build")
            .join(LIB_DIR)
            .join(format!("compiler{stage}.wasm"))
    }

    /// `<host> <shim> <output> <source>`, in that fixed order.
    pub fn bootstrap_command(&self, output: &OutputTarget, source: &Path) -> CommandLine {
        CommandLine::new(&self.host)
            .arg(&self.shim)
            .arg(output.as_arg())
            .arg(source)
    }

    /// `<runtime> <launcher> <verb> <image>`; callers append verb arguments.
    pub fn runtime_command(
        &self,
        runtime: RuntimeKind,
        verb: LauncherVerb,
        image: &Path,
    ) -> CommandLine {
        match runtime {
            RuntimeKind::Node => CommandLine::new(&self.node)
                .arg(&self.launcher)
                .arg(verb.as_str())
                .arg(image),
        }
    }
}

/// The directory above the one holding the running executable, or `.` when
/// that cannot be determined.
pub fn default_root() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent()?.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

//! External process execution for the schism driver.
//!
//! Every bootstrap, compile, and evaluation step in the driver is delegated to
//! an external program. This crate owns the one place where those programs are
//! spawned:
//!
//! - [`CommandLine`]: an owned program + argument list with a shell-like
//!   `Display` used for logging
//! - [`ProcessRunner`]: the async seam the orchestrators call through, so tests
//!   can script process outcomes
//! - [`TokioRunner`]: the real implementation on `tokio::process`
//!
//! # Example
//!
//! ```ignore
//! use schism_exec::{CommandLine, ProcessRunner, TokioRunner};
//!
//! let runner = TokioRunner::new();
//! let result = runner.run(&CommandLine::new("guile-2.2").arg("--version")).await?;
//! assert!(result.success());
//! ```

pub mod command;
pub mod runner;

pub use command::CommandLine;
pub use runner::{ProcessResult, ProcessRunner, RunError, TokioRunner};

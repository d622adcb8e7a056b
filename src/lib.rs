//! Driver for the schism Scheme-to-WebAssembly compiler.
//!
//! The driver never compiles anything itself. It decides which of three modes
//! an invocation is in and delegates to external programs:
//!
//! - **Bootstrap**: a host Scheme (Guile) runs the bootstrap shim to build a
//!   first compiler image from source ([`bootstrap`])
//! - **Compile with image**: the runtime launcher compiles each input file, or
//!   evaluates `--evaluate` forms, with an existing image ([`compile`])
//! - **Interactive**: the launcher's REPL on the current terminal ([`session`])
//!
//! [`driver::run`] ties the pieces together; [`report`] renders the result.

pub mod bootstrap;
pub mod cli;
pub mod compile;
pub mod config;
pub mod driver;
pub mod mode;
pub mod outcome;
pub mod report;
pub mod session;
pub mod template;
pub mod toolchain;

#[cfg(test)]
mod testing;

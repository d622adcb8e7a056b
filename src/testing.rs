//! Scripted [`ProcessRunner`] for unit tests.

use async_trait::async_trait;
use schism_exec::{CommandLine, ProcessResult, ProcessRunner, RunError};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::Configuration;
use crate::toolchain::Toolchain;

type Responder = Box<dyn Fn(&CommandLine) -> Result<ProcessResult, RunError> + Send + Sync>;
type Delay = Box<dyn Fn(&CommandLine) -> Duration + Send + Sync>;

pub(crate) struct ScriptedRunner {
    respond: Responder,
    delay: Option<Delay>,
    calls: Mutex<Vec<CommandLine>>,
}

impl ScriptedRunner {
    pub(crate) fn new(
        respond: impl Fn(&CommandLine) -> Result<ProcessResult, RunError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every command exits 0 with `stdout` and no stderr.
    pub(crate) fn succeeding(stdout: &'static [u8]) -> Self {
        Self::new(move |_| Ok(ok(stdout)))
    }

    pub(crate) fn with_delay(
        mut self,
        delay: impl Fn(&CommandLine) -> Duration + Send + Sync + 'static,
    ) -> Self {
        self.delay = Some(Box::new(delay));
        self
    }

    pub(crate) fn calls(&self) -> Vec<CommandLine> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(&self, command: &CommandLine) -> Result<ProcessResult, RunError> {
        self.calls.lock().unwrap().push(command.clone());
        if let Some(delay) = &self.delay {
            tokio::time::sleep(delay(command)).await;
        }
        (self.respond)(command)
    }

    async fn run_attached(&self, command: &CommandLine) -> Result<i32, RunError> {
        self.run(command).await.map(|result| result.exit_code)
    }
}

pub(crate) fn ok(stdout: &[u8]) -> ProcessResult {
    ProcessResult {
        exit_code: 0,
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub(crate) fn exited(exit_code: i32, stderr: &str) -> ProcessResult {
    ProcessResult {
        exit_code,
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Last argument of `command`, lossy.
pub(crate) fn last_arg(command: &CommandLine) -> String {
    command
        .get_args()
        .last()
        .map(|arg| arg.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Configuration rooted at `/opt/schism`, with `cwd` as the working directory.
pub(crate) fn config_in(cwd: &Path) -> Configuration {
    Configuration::builder()
        .toolchain(Toolchain::from_root("/opt/schism"))
        .build(cwd)
        .unwrap()
}

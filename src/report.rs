//! Human-readable and JSON output for a finished run.
//!
//! The human report goes to stderr so that stdout stays reserved for module
//! bytes and evaluation output. With `--json` the report itself is written to
//! stdout and any stdout-bound bytes are embedded base64-encoded instead.

use base64::prelude::{Engine as _, BASE64_STANDARD};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::driver::RunSummary;
use crate::outcome::{Operation, Outcome, StepReport};
use crate::template::OutputTarget;

const GREEN: &str = "32";
const YELLOW: &str = "33";
const RED: &str = "31";
const BOLD: &str = "1";

fn paint(text: &str, code: &str, color: bool) -> String {
    if color {
        format!("\x1b[{code}m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

fn step_label(step: &StepReport) -> String {
    match (&step.operation, &step.source) {
        (Operation::Compile(file), _) => format!("compile {}", file.display()),
        (op, Some(source)) => format!("{} {}", op.name(), source.display()),
        (op, None) => op.name().to_string(),
    }
}

/// Append `stderr` verbatim, newline-terminated.
fn push_stderr(out: &mut String, stderr: &str) {
    if stderr.is_empty() {
        return;
    }
    out.push_str(stderr);
    if !stderr.ends_with('\n') {
        out.push('\n');
    }
}

/// Format one step for the terminal.
pub fn format_step(step: &StepReport, color: bool) -> String {
    let mut out = String::new();
    let label = step_label(step);
    let target = match &step.target {
        Some(target) => format!(" -> {target}"),
        None => String::new(),
    };

    match &step.outcome {
        Outcome::Success => {
            out.push_str(&paint("✓", GREEN, color));
            out.push_str(&format!(" {label}{target}\n"));
        }
        Outcome::SuccessWithWarnings => {
            out.push_str(&paint("!", YELLOW, color));
            out.push_str(&format!(" {label}{target} (with warnings)\n"));
            if let Some(result) = &step.result {
                push_stderr(&mut out, &result.stderr_lossy());
            }
        }
        Outcome::Failed(err) => {
            out.push_str(&paint(&format!("✗ {err}"), RED, color));
            out.push('\n');
            if let Some(stderr) = err.reason().and_then(|reason| reason.stderr()) {
                push_stderr(&mut out, stderr);
            }
        }
    }
    out
}

/// Format a whole run for the terminal.
///
/// A successful interactive session prints nothing; the user has just watched
/// it happen.
pub fn format_summary(summary: &RunSummary, color: bool) -> String {
    let mut out = String::new();
    for step in &summary.steps {
        if matches!(step.operation, Operation::Interactive) && !step.outcome.is_failure() {
            continue;
        }
        out.push_str(&format_step(step, color));
    }

    let failures = summary.failures();
    if failures > 0 && summary.steps.len() > 1 {
        let line = format!("{} of {} steps failed", failures, summary.steps.len());
        out.push_str(&paint(&line, BOLD, color));
        out.push('\n');
    }
    out
}

#[derive(Serialize)]
struct StepJson<'a> {
    operation: &'static str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<&'a OutputTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stderr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stdout_base64: Option<String>,
}

#[derive(Serialize)]
struct SummaryJson<'a> {
    mode: String,
    exit_code: u8,
    failures: usize,
    steps: Vec<StepJson<'a>>,
}

fn step_json(step: &StepReport) -> StepJson<'_> {
    let stderr = step
        .result
        .as_ref()
        .filter(|result| result.has_stderr())
        .map(|result| result.stderr_lossy());
    StepJson {
        operation: step.operation.name(),
        status: step.outcome.status(),
        source: step.source.as_ref(),
        target: step.target.as_ref(),
        exit_code: step.result.as_ref().map(|result| result.exit_code),
        stderr,
        error: step.outcome.error().map(|err| err.to_string()),
        stdout_base64: step
            .stdout_payload()
            .map(|bytes| BASE64_STANDARD.encode(bytes)),
    }
}

/// Format a whole run as pretty-printed JSON.
pub fn format_summary_json(summary: &RunSummary) -> String {
    let json = SummaryJson {
        mode: summary.mode.to_string(),
        exit_code: summary.exit_code(),
        failures: summary.failures(),
        steps: summary.steps.iter().map(step_json).collect(),
    };
    serde_json::to_string_pretty(&json).unwrap_or_else(|_| "{}".to_string())
}

/// Format an error that stopped the run before any step.
pub fn format_error(error: &anyhow::Error, json_output: bool, color: bool) -> String {
    if json_output {
        #[derive(Serialize)]
        struct ErrorJson {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            cause: Option<String>,
        }

        let err = ErrorJson {
            error: error.to_string(),
            cause: error.source().map(|e| e.to_string()),
        };
        serde_json::to_string_pretty(&err).unwrap_or_else(|_| "{}".to_string())
    } else {
        let mut out = format!("{} {}\n", paint("error:", RED, color), error);
        let mut causes = error.chain().skip(1).peekable();
        if causes.peek().is_some() {
            out.push_str("Caused by:\n");
            for (idx, cause) in causes.enumerate() {
                out.push_str(&format!("  {}: {}\n", idx + 1, cause));
            }
        }
        out
    }
}

/// Copy every stdout-bound payload to `out`, verbatim and in step order.
pub fn write_payloads(summary: &RunSummary, out: &mut impl Write) -> io::Result<()> {
    for payload in summary.stdout_payloads() {
        out.write_all(payload)?;
    }
    out.flush()
}

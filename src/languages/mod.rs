mod java;
mod native;
mod python;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    config::RunnerConfig,
    models::{Language, RunOutcome},
    process::{Captured, RunError},
    workspace::Workspace,
};

pub use java::JavaAdapter;
pub use native::{NativeAdapter, NativeFlavor};
pub use python::PythonAdapter;

/// Per-language strategy: harness the submitted code, compile when the
/// language needs it, run it inside the workspace, and translate what
/// came back into the public envelope. Adapters never return an error
/// past this boundary; every failure mode becomes `RunOutcome::Failure`.
#[async_trait]
pub trait LanguageAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(
        &self,
        workspace: &Workspace,
        code: &str,
        input: Option<&Value>,
        config: &RunnerConfig,
    ) -> RunOutcome;
}

static PYTHON: PythonAdapter = PythonAdapter;
static JAVA: JavaAdapter = JavaAdapter;
static CPP: NativeAdapter = NativeAdapter::new(NativeFlavor::Cpp);
static C: NativeAdapter = NativeAdapter::new(NativeFlavor::C);

/// Closed dispatch table over the language enum. Adding a language means
/// adding a variant and an adapter, not growing a conditional chain.
pub fn adapter_for(language: Language) -> &'static dyn LanguageAdapter {
    match language {
        Language::Python => &PYTHON,
        Language::Java => &JAVA,
        Language::Cpp => &CPP,
        Language::C => &C,
    }
}

/// One wall-clock budget per request, compile time included. Each
/// pipeline step gets whatever is left.
pub(crate) struct Budget {
    deadline: Instant,
}

impl Budget {
    pub(crate) fn start(config: &RunnerConfig) -> Self {
        Self {
            deadline: Instant::now() + config.timeout,
        }
    }

    pub(crate) fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

/// Splits captured stdout by the shared rule: the last non-blank line is
/// the result, every non-blank line before it is log output.
pub(crate) fn split_output(stdout: &str) -> (Option<&str>, Vec<String>) {
    let lines: Vec<&str> = stdout.lines().collect();
    match lines.iter().rposition(|line| !line.trim().is_empty()) {
        Some(idx) => {
            let logs = lines[..idx]
                .iter()
                .filter(|line| !line.trim().is_empty())
                .map(|line| line.to_string())
                .collect();
            (Some(lines[idx].trim()), logs)
        }
        None => (None, Vec::new()),
    }
}

/// Best-effort JSON decode of a result line, raw string fallback.
pub(crate) fn decode_result(line: &str) -> Value {
    serde_json::from_str(line).unwrap_or_else(|_| Value::String(line.to_string()))
}

/// Success envelope for the paths that separate logs from the result
/// (interpreted and JVM). `extra_logs` is appended after the stdout logs.
pub(crate) fn last_line_success(captured: &Captured, mut extra_logs: Vec<String>) -> RunOutcome {
    let (result_line, mut logs) = split_output(&captured.stdout);
    logs.append(&mut extra_logs);
    if captured.truncated {
        logs.push(TRUNCATION_MARKER.to_string());
    }
    RunOutcome::Success {
        output: captured.stdout.trim_end_matches('\n').to_string(),
        result: decode_result(result_line.unwrap_or_default()),
        logs,
    }
}

pub(crate) const TRUNCATION_MARKER: &str = "[output truncated]";

/// Uniform translation of runner failures into the public envelope.
/// `collect_stdout_logs` is false on the native path, which drops
/// intermediate stdout lines entirely.
pub(crate) fn failure_from(
    err: RunError,
    config: &RunnerConfig,
    collect_stdout_logs: bool,
) -> RunOutcome {
    match err {
        RunError::Timeout => RunOutcome::failure(config.timeout_message()),
        RunError::Exit {
            message, stdout, ..
        } => {
            let logs = if collect_stdout_logs {
                stdout
                    .lines()
                    .filter(|line| !line.trim().is_empty())
                    .map(|line| line.to_string())
                    .collect()
            } else {
                Vec::new()
            };
            RunOutcome::Failure {
                error: message,
                logs,
            }
        }
        other => RunOutcome::failure(other.to_string()),
    }
}

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    config::RunnerConfig,
    languages::{Budget, LanguageAdapter, failure_from, last_line_success},
    models::RunOutcome,
    process::{RunOptions, run},
    workspace::Workspace,
};

/// Interpreted path: no compile step. The whole JSON input value is piped
/// as one stdin blob; the harness decodes it (skipping the decode when
/// stdin is blank), calls `solve`, and prints the JSON-encoded return
/// value as the last stdout line. An undefined `solve` or a raised
/// exception exits non-zero, so the harness can never produce a silent
/// wrong answer.
pub struct PythonAdapter;

const SOURCE_NAME: &str = "solution.py";

const ENTRY_BLOCK: &str = r#"
if __name__ == "__main__":
    _raw = sys.stdin.read()
    _value = json.loads(_raw) if _raw.strip() else None
    print(json.dumps(solve(_value)))
"#;

fn harnessed(code: &str) -> String {
    format!("import sys\nimport json\n\n{code}\n{ENTRY_BLOCK}")
}

#[async_trait]
impl LanguageAdapter for PythonAdapter {
    fn name(&self) -> &'static str {
        "python"
    }

    async fn execute(
        &self,
        workspace: &Workspace,
        code: &str,
        input: Option<&Value>,
        config: &RunnerConfig,
    ) -> RunOutcome {
        let budget = Budget::start(config);
        if let Err(err) = workspace.write_file(SOURCE_NAME, &harnessed(code)).await {
            return RunOutcome::failure(err.to_string());
        }

        let outcome = run(
            &config.toolchain.python,
            &[SOURCE_NAME],
            RunOptions {
                cwd: workspace.path(),
                stdin: input.map(|value| value.to_string()),
                timeout: budget.remaining(),
                max_output_bytes: config.max_output_bytes,
            },
        )
        .await;

        match outcome {
            Ok(captured) => last_line_success(&captured, Vec::new()),
            Err(err) => failure_from(err, config, true),
        }
    }
}

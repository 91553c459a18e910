use async_trait::async_trait;
use serde_json::Value;

use crate::{
    config::RunnerConfig,
    languages::{Budget, LanguageAdapter, failure_from, last_line_success},
    models::RunOutcome,
    process::{RunOptions, run},
    workspace::Workspace,
};

/// JVM path: harness and user source compile together as `Main.java`.
/// When the submitted code carries no entry point, one is injected before
/// the closing brace of the last top-level type. The injected `main`
/// reads a single stdin line (the raw JSON text, `"null"` when the
/// request had no input) and prints `solve(line)`.
pub struct JavaAdapter;

const SOURCE_NAME: &str = "Main.java";
const CLASS_NAME: &str = "Main";

const MAIN_SNIPPET: &str = r#"
    public static void main(String[] args) throws Exception {
        java.io.BufferedReader _reader =
            new java.io.BufferedReader(new java.io.InputStreamReader(System.in));
        String _input = _reader.readLine();
        if (_input == null) {
            _input = "null";
        }
        System.out.println(solve(_input));
    }
"#;

fn with_entry_point(code: &str) -> String {
    if code.contains("static void main") {
        return code.to_string();
    }
    match code.rfind('}') {
        // Inject before the closing brace of the last top-level type.
        Some(idx) => format!("{}{}{}", &code[..idx], MAIN_SNIPPET, &code[idx..]),
        // Bare methods with no surrounding class: wrap them in one.
        None => format!("public class {CLASS_NAME} {{\n{code}\n{MAIN_SNIPPET}}}\n"),
    }
}

#[async_trait]
impl LanguageAdapter for JavaAdapter {
    fn name(&self) -> &'static str {
        "java"
    }

    async fn execute(
        &self,
        workspace: &Workspace,
        code: &str,
        input: Option<&Value>,
        config: &RunnerConfig,
    ) -> RunOutcome {
        let budget = Budget::start(config);
        if let Err(err) = workspace
            .write_file(SOURCE_NAME, &with_entry_point(code))
            .await
        {
            return RunOutcome::failure(err.to_string());
        }

        let compile = run(
            &config.toolchain.javac,
            &[SOURCE_NAME],
            RunOptions {
                cwd: workspace.path(),
                stdin: None,
                timeout: budget.remaining(),
                max_output_bytes: config.max_output_bytes,
            },
        )
        .await;
        if let Err(err) = compile {
            return failure_from(err, config, false);
        }

        let stdin_line = match input {
            Some(value) => format!("{value}\n"),
            None => "null\n".to_string(),
        };
        let outcome = run(
            &config.toolchain.java,
            &[CLASS_NAME],
            RunOptions {
                cwd: workspace.path(),
                stdin: Some(stdin_line),
                timeout: budget.remaining(),
                max_output_bytes: config.max_output_bytes,
            },
        )
        .await;

        match outcome {
            Ok(captured) => {
                // Non-fatal stderr chatter rides along as one extra log entry.
                let extra = if captured.stderr.trim().is_empty() {
                    Vec::new()
                } else {
                    vec![captured.stderr.trim_end().to_string()]
                };
                last_line_success(&captured, extra)
            }
            Err(err) => failure_from(err, config, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::with_entry_point;

    #[test]
    fn injects_main_before_the_last_closing_brace() {
        let code = "public class Main {\n    static String solve(String s) { return s; }\n}";
        let source = with_entry_point(code);
        assert!(source.contains("public static void main"));
        assert!(source.trim_end().ends_with('}'));
        let main_at = source.find("public static void main").unwrap();
        let solve_at = source.find("static String solve").unwrap();
        assert!(solve_at < main_at);
    }

    #[test]
    fn keeps_user_supplied_main_untouched() {
        let code = "public class Main {\n    public static void main(String[] a) {}\n}";
        assert_eq!(with_entry_point(code), code);
    }

    #[test]
    fn wraps_brace_free_code_in_a_class() {
        let source = with_entry_point("// nothing submitted yet");
        assert!(source.starts_with("public class Main {"));
        assert!(source.contains("public static void main"));
    }
}

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    config::RunnerConfig,
    languages::{Budget, LanguageAdapter, TRUNCATION_MARKER, decode_result, failure_from},
    models::RunOutcome,
    process::{RunOptions, run},
    workspace::Workspace,
};

/// One adapter covering both C-family flavors. User code is concatenated
/// with an include prelude and a generated `main` that reads the two-line
/// positional input (comma-separated integers, then a single integer) and
/// prints the values returned by `solve`, space-separated, on one line.
///
/// Unlike the interpreted and JVM paths, this one surfaces only the
/// literal last stdout line and keeps no logs.
pub struct NativeAdapter {
    flavor: NativeFlavor,
}

#[derive(Debug, Clone, Copy)]
pub enum NativeFlavor {
    C,
    Cpp,
}

const BINARY_NAME: &str = "solution";

const CPP_PRELUDE: &str = r#"#include <cstdio>
#include <cstdlib>
#include <iostream>
#include <sstream>
#include <string>
#include <vector>
using namespace std;
"#;

// Expects: vector<int> solve(vector<int>& nums, int target)
const CPP_MAIN: &str = r#"
int main() {
    string _line1, _line2;
    getline(cin, _line1);
    getline(cin, _line2);
    vector<int> _nums;
    stringstream _ss(_line1);
    string _tok;
    while (getline(_ss, _tok, ',')) {
        if (!_tok.empty()) {
            _nums.push_back(stoi(_tok));
        }
    }
    int _target = _line2.empty() ? 0 : stoi(_line2);
    vector<int> _out = solve(_nums, _target);
    for (size_t _i = 0; _i < _out.size(); ++_i) {
        if (_i) {
            cout << ' ';
        }
        cout << _out[_i];
    }
    cout << "\n";
    return 0;
}
"#;

const C_PRELUDE: &str = r#"#include <stdio.h>
#include <stdlib.h>
#include <string.h>
"#;

// Expects: int* solve(int* nums, int numsSize, int target, int* returnSize)
const C_MAIN: &str = r#"
int main(void) {
    static char _line1[1 << 16];
    char _line2[64];
    if (!fgets(_line1, sizeof _line1, stdin)) {
        _line1[0] = '\0';
    }
    if (!fgets(_line2, sizeof _line2, stdin)) {
        _line2[0] = '\0';
    }
    static int _nums[1 << 14];
    int _count = 0;
    char *_tok = strtok(_line1, ", \t\r\n");
    while (_tok != NULL && _count < (1 << 14)) {
        _nums[_count++] = atoi(_tok);
        _tok = strtok(NULL, ", \t\r\n");
    }
    int _target = atoi(_line2);
    int _return_size = 0;
    int *_out = solve(_nums, _count, _target, &_return_size);
    for (int _i = 0; _i < _return_size; ++_i) {
        if (_i) {
            putchar(' ');
        }
        printf("%d", _out[_i]);
    }
    putchar('\n');
    return 0;
}
"#;

impl NativeAdapter {
    pub const fn new(flavor: NativeFlavor) -> Self {
        Self { flavor }
    }

    fn source_name(&self) -> &'static str {
        match self.flavor {
            NativeFlavor::C => "solution.c",
            NativeFlavor::Cpp => "solution.cpp",
        }
    }

    fn harnessed(&self, code: &str) -> String {
        match self.flavor {
            NativeFlavor::C => format!("{C_PRELUDE}\n{code}\n{C_MAIN}"),
            NativeFlavor::Cpp => format!("{CPP_PRELUDE}\n{code}\n{CPP_MAIN}"),
        }
    }

    fn compiler<'a>(&self, config: &'a RunnerConfig) -> &'a str {
        match self.flavor {
            NativeFlavor::C => &config.toolchain.cc,
            NativeFlavor::Cpp => &config.toolchain.cxx,
        }
    }
}

/// Derives the two positional stdin lines from the JSON `input`:
/// `[[2, 7, 11], 9]` becomes `"2,7,11\n9\n"`. A flat array fills only the
/// first line; a scalar fills one line; no input means empty stdin.
fn positional_stdin(input: Option<&Value>) -> String {
    let Some(value) = input else {
        return String::new();
    };
    match value {
        Value::Array(items) => match items.as_slice() {
            [Value::Array(numbers), rest @ ..] => {
                let line1 = join_values(numbers);
                let line2 = rest.first().map(render_value).unwrap_or_default();
                format!("{line1}\n{line2}\n")
            }
            _ => format!("{}\n", join_values(items)),
        },
        other => format!("{}\n", render_value(other)),
    }
}

fn join_values(items: &[Value]) -> String {
    items
        .iter()
        .map(render_value)
        .collect::<Vec<_>>()
        .join(",")
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl LanguageAdapter for NativeAdapter {
    fn name(&self) -> &'static str {
        match self.flavor {
            NativeFlavor::C => "c",
            NativeFlavor::Cpp => "cpp",
        }
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
            .write_file(self.source_name(), &self.harnessed(code))
            .await
        {
            return RunOutcome::failure(err.to_string());
        }

        let compile = run(
            self.compiler(config),
            &[self.source_name(), "-O2", "-o", BINARY_NAME],
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

        let outcome = run(
            &format!("./{BINARY_NAME}"),
            &[],
            RunOptions {
                cwd: workspace.path(),
                stdin: Some(positional_stdin(input)),
                timeout: budget.remaining(),
                max_output_bytes: config.max_output_bytes,
            },
        )
        .await;

        match outcome {
            Ok(captured) => {
                // Last line only; a blank line (empty returned vector) is
                // a valid result, and intermediate lines are dropped.
                let last = captured.stdout.lines().last().unwrap_or("");
                let logs = if captured.truncated {
                    vec![TRUNCATION_MARKER.to_string()]
                } else {
                    Vec::new()
                };
                RunOutcome::Success {
                    output: captured.stdout.trim_end_matches('\n').to_string(),
                    result: decode_result(last.trim()),
                    logs,
                }
            }
            Err(err) => failure_from(err, config, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{NativeAdapter, NativeFlavor, positional_stdin};

    #[test]
    fn derives_two_lines_from_the_list_plus_scalar_shape() {
        let input = json!([[2, 7, 11, 15], 9]);
        assert_eq!(positional_stdin(Some(&input)), "2,7,11,15\n9\n");
    }

    #[test]
    fn flat_arrays_and_scalars_fill_a_single_line() {
        assert_eq!(positional_stdin(Some(&json!([1, 2, 3]))), "1,2,3\n");
        assert_eq!(positional_stdin(Some(&json!(42))), "42\n");
        assert_eq!(positional_stdin(None), "");
    }

    #[test]
    fn empty_list_still_yields_both_lines() {
        let input = json!([[], 9]);
        assert_eq!(positional_stdin(Some(&input)), "\n9\n");
    }

    #[test]
    fn harness_sandwiches_user_code_between_prelude_and_main() {
        let adapter = NativeAdapter::new(NativeFlavor::Cpp);
        let source = adapter.harnessed("vector<int> solve(vector<int>& n, int t) { return {}; }");
        assert!(source.starts_with("#include <cstdio>"));
        let user_at = source.find("vector<int> solve").unwrap();
        let main_at = source.find("int main()").unwrap();
        assert!(user_at < main_at);

        let c_adapter = NativeAdapter::new(NativeFlavor::C);
        assert_eq!(c_adapter.source_name(), "solution.c");
        assert!(c_adapter.harnessed("/* solve */").contains("int main(void)"));
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The four languages the service knows how to harness and run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Java,
    Cpp,
    C,
}

impl Language {
    pub const ALL: [Language; 4] = [Language::Python, Language::Java, Language::Cpp, Language::C];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "python" => Some(Language::Python),
            "java" => Some(Language::Java),
            "cpp" => Some(Language::Cpp),
            "c" => Some(Language::C),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Java => "java",
            Language::Cpp => "cpp",
            Language::C => "c",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated execution request. Lives for exactly one HTTP request.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub language: Language,
    pub code: String,
    pub input: Option<Value>,
}

/// The uniform envelope returned to callers regardless of language or
/// failure type. Execution-level failures (compile error, runtime error,
/// timeout) still travel as HTTP 200 with the `Failure` shape.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RunOutcome {
    Success {
        output: String,
        result: Value,
        logs: Vec<String>,
    },
    Failure {
        error: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        logs: Vec<String>,
    },
}

impl RunOutcome {
    pub fn failure(error: impl Into<String>) -> Self {
        RunOutcome::Failure {
            error: error.into(),
            logs: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success { .. })
    }

    pub fn timed_out(&self) -> bool {
        matches!(self, RunOutcome::Failure { error, .. } if error.starts_with("Timeout"))
    }
}

#[cfg(test)]
mod tests {
    use super::{Language, RunOutcome};

    #[test]
    fn language_parses_the_four_supported_values() {
        for lang in Language::ALL {
            assert_eq!(Language::parse(lang.as_str()), Some(lang));
        }
        assert_eq!(Language::parse("ruby"), None);
        assert_eq!(Language::parse("Python"), None);
    }

    #[test]
    fn success_envelope_has_output_result_and_logs() {
        let outcome = RunOutcome::Success {
            output: "5".to_string(),
            result: serde_json::json!(5),
            logs: vec![],
        };
        let body = serde_json::to_value(&outcome).unwrap();
        assert_eq!(body["output"], "5");
        assert_eq!(body["result"], 5);
        assert!(body["logs"].as_array().unwrap().is_empty());
        assert!(body.get("error").is_none());
    }

    #[test]
    fn failure_envelope_omits_empty_logs() {
        let body = serde_json::to_value(RunOutcome::failure("Timeout (10s)")).unwrap();
        assert_eq!(body["error"], "Timeout (10s)");
        assert!(body.get("logs").is_none());
    }
}

//! Result types handed back to the host after a sandboxed run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionClassification {
    /// Exit status zero.
    Success,
    /// Non-zero exit; carries the captured standard error.
    RuntimeError {
        stderr: String,
        exit_code: Option<i32>,
    },
    /// The wall-clock bound elapsed and the child was killed.
    TimedOut,
    /// The validator rejected the code; nothing was run.
    Blocked { reason: String },
    /// The interpreter could not be started (or waited on).
    LaunchFailed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Captured standard output. Empty for `TimedOut`, `Blocked` and `LaunchFailed`.
    pub stdout: String,
    pub classification: ExecutionClassification,
    /// Wall time spent in the executor, in milliseconds.
    pub duration_ms: u64,
}

impl ExecutionResult {
    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            classification: ExecutionClassification::Blocked {
                reason: reason.into(),
            },
            duration_ms: 0,
        }
    }

    pub(crate) fn launch_failed(reason: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            stdout: String::new(),
            classification: ExecutionClassification::LaunchFailed {
                reason: reason.into(),
            },
            duration_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.classification == ExecutionClassification::Success
    }
}

/// User-facing rendering of a result.
impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.classification {
            ExecutionClassification::Success => write!(f, "{}", self.stdout),
            ExecutionClassification::RuntimeError { stderr, .. } => write!(f, "Error: {}", stderr),
            ExecutionClassification::TimedOut => write!(f, "Execution timed out"),
            ExecutionClassification::Blocked { reason } => {
                write!(f, "Code blocked due to security restrictions ({})", reason)
            }
            ExecutionClassification::LaunchFailed { reason } => {
                write!(f, "Could not start the interpreter: {}", reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_separates_failure_from_hang() {
        let failed = ExecutionResult {
            stdout: String::new(),
            classification: ExecutionClassification::RuntimeError {
                stderr: "ZeroDivisionError".to_string(),
                exit_code: Some(1),
            },
            duration_ms: 12,
        };
        let hung = ExecutionResult {
            stdout: String::new(),
            classification: ExecutionClassification::TimedOut,
            duration_ms: 5000,
        };
        assert_eq!(failed.to_string(), "Error: ZeroDivisionError");
        assert_eq!(hung.to_string(), "Execution timed out");
    }

    #[test]
    fn serializes_with_status_tag() {
        let blocked = ExecutionResult::blocked("import of denied module 'os'");
        let value = serde_json::to_value(&blocked).unwrap();
        assert_eq!(value["classification"]["status"], "blocked");
        assert_eq!(value["classification"]["reason"], "import of denied module 'os'");
        assert!(!blocked.is_success());
    }
}

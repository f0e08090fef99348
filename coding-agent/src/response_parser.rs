//! Parsing of raw generation-service replies.
//!
//! The expected reply shape is either
//!
//! ~~~text
//! [CLARIFICATION] <question>
//! ~~~
//!
//! or
//!
//! ~~~text
//! [CODE]
//! ```python
//! <code>
//! ```
//! [EXPLANATION]
//! <explanation>
//! ~~~
//!
//! Matching is purely textual. Anything that does not fit degrades to
//! [`ParsedResponse::Malformed`]; parsing never fails.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const CLARIFICATION_MARKER: &str = "[CLARIFICATION]";
pub const CODE_MARKER: &str = "[CODE]";
pub const EXPLANATION_MARKER: &str = "[EXPLANATION]";

lazy_static! {
    /// Span between the code and explanation markers.
    static ref CODE_SECTION: Regex = Regex::new(r"(?s)\[CODE\](.*?)\[EXPLANATION\]").unwrap();
    /// Python-tagged fenced block inside the code section.
    static ref PYTHON_FENCE: Regex = Regex::new(r"(?s)```python(.*?)```").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedReason {
    /// No `[CODE] ... [EXPLANATION]` span.
    NoCodeGenerated,
    /// The span exists but holds no ```python fenced block.
    InvalidCodeFormat,
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedReason::NoCodeGenerated => write!(f, "No code generated"),
            MalformedReason::InvalidCodeFormat => write!(f, "Invalid code format"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParsedResponse {
    Clarification {
        question: String,
    },
    Solution {
        code: String,
        explanation: String,
    },
    Malformed {
        reason: MalformedReason,
        explanation: Option<String>,
        raw: String,
    },
}

impl ParsedResponse {
    pub fn kind(&self) -> &'static str {
        match self {
            ParsedResponse::Clarification { .. } => "clarification",
            ParsedResponse::Solution { .. } => "solution",
            ParsedResponse::Malformed { .. } => "malformed",
        }
    }
}

pub fn parse(reply: &str) -> ParsedResponse {
    if let Some(question) = clarification_question(reply) {
        return ParsedResponse::Clarification { question };
    }

    let Some(section) = CODE_SECTION.captures(reply).and_then(|caps| caps.get(1)) else {
        return ParsedResponse::Malformed {
            reason: MalformedReason::NoCodeGenerated,
            explanation: None,
            raw: reply.to_string(),
        };
    };

    let explanation = explanation_text(reply);

    match PYTHON_FENCE
        .captures(section.as_str())
        .and_then(|caps| caps.get(1))
    {
        Some(code) => ParsedResponse::Solution {
            code: code.as_str().trim().to_string(),
            explanation: explanation.unwrap_or_default(),
        },
        None => ParsedResponse::Malformed {
            reason: MalformedReason::InvalidCodeFormat,
            explanation,
            raw: reply.to_string(),
        },
    }
}

/// Trimmed text after the clarification marker, possibly empty.
fn clarification_question(reply: &str) -> Option<String> {
    reply
        .split_once(CLARIFICATION_MARKER)
        .map(|(_, rest)| rest.trim().to_string())
}

/// Text after the last explanation marker.
fn explanation_text(reply: &str) -> Option<String> {
    reply
        .rsplit_once(EXPLANATION_MARKER)
        .map(|(_, rest)| rest.trim().to_string())
        .filter(|text| !text.is_empty())
}

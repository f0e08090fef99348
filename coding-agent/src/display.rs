//! Text rendering for the interactive surface.

use python_sandbox::{ExecutionResult, UnsafeReason, ValidationOutcome};
use std::io::{self, Write};

use crate::interaction_state::{RealizedResponse, SolutionStage};
use crate::response_parser::ParsedResponse;

pub const TASK_PROMPT: &str = "\nEnter your coding task (or 'quit' to exit): ";
pub const CLARIFICATION_PROMPT: &str = "Your clarification: ";
pub const FEEDBACK_PROMPT: &str = "\nProvide feedback (or press enter to continue): ";
pub const FEEDBACK_ACK: &str = "Feedback received. Improving solution...";
pub const EXHAUSTED_MESSAGE: &str = "Maximum retry attempts reached. Please refine your query.";

const NO_EXPLANATION: &str = "No explanation available";

pub fn write_prompt<W: Write>(out: &mut W, prompt: &str) -> io::Result<()> {
    write!(out, "{}", prompt)?;
    out.flush()
}

pub fn write_clarification<W: Write>(out: &mut W, question: &str) -> io::Result<()> {
    writeln!(out, "\nClarification needed: {}", question)
}

pub fn write_solution<W: Write>(
    out: &mut W,
    stage: SolutionStage,
    realized: &RealizedResponse,
) -> io::Result<()> {
    let prefix = stage.label();
    let (code, explanation) = match &realized.response {
        ParsedResponse::Solution { code, explanation } => {
            (code.clone(), non_empty_or(explanation, NO_EXPLANATION))
        }
        ParsedResponse::Malformed {
            reason,
            explanation,
            raw,
        } => {
            let explanation = explanation
                .as_deref()
                .map(|e| non_empty_or(e, NO_EXPLANATION))
                .unwrap_or_else(|| non_empty_or(raw, NO_EXPLANATION));
            (reason.to_string(), explanation)
        }
        ParsedResponse::Clarification { question } => {
            (String::new(), non_empty_or(question, NO_EXPLANATION))
        }
    };

    writeln!(out, "\n=== {} CODE ===", prefix)?;
    writeln!(out, "{}", code)?;
    writeln!(out, "\n=== {} EXPLANATION ===", prefix)?;
    writeln!(out, "{}", explanation)?;
    writeln!(out, "\n=== EXECUTION RESULT ===")?;
    match &realized.execution {
        Some(result) => write_execution_result(out, result),
        None => writeln!(out),
    }
}

fn write_execution_result<W: Write>(out: &mut W, result: &ExecutionResult) -> io::Result<()> {
    let text = result.to_string();
    if text.ends_with('\n') {
        write!(out, "{}", text)
    } else {
        writeln!(out, "{}", text)
    }
}

/// Outcome line for `--check`.
pub fn write_check_outcome<W: Write>(
    out: &mut W,
    file: &str,
    outcome: &ValidationOutcome,
) -> io::Result<()> {
    match outcome {
        ValidationOutcome::Safe(_) => writeln!(out, "{}: safe", file),
        ValidationOutcome::Unsafe { reason } => match reason {
            UnsafeReason::Unparseable { detail } => {
                writeln!(out, "{}: unsafe (unparseable: {})", file, detail)
            }
            UnsafeReason::DeniedImport { .. } => writeln!(out, "{}: unsafe ({})", file, reason),
        },
    }
}

fn non_empty_or(text: &str, fallback: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

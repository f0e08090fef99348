//! Line-oriented driver for the interaction state machine.
//!
//! Reads tasks, clarification answers and feedback from any `AsyncBufRead`
//! and renders each [`Step`] to any `Write`. End of input behaves like `quit`.

use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::display::{
    write_clarification, write_prompt, write_solution, CLARIFICATION_PROMPT, EXHAUSTED_MESSAGE,
    FEEDBACK_ACK, FEEDBACK_PROMPT, TASK_PROMPT,
};
use crate::error::AgentError;
use crate::generation::GenerationService;
use crate::interaction_state::{InteractionEvent, Step};
use crate::state_machine::InteractionStateMachine;

const EXIT_KEYWORDS: &[&str] = &["quit", "exit"];

pub fn is_exit_keyword(line: &str) -> bool {
    let line = line.trim();
    EXIT_KEYWORDS.iter().any(|k| line.eq_ignore_ascii_case(k))
}

/// Run tasks until the user quits or input ends.
///
/// `initial_task` is handled first, as if typed at the task prompt. Per-task
/// errors are printed and the loop moves on; only fatal errors are returned.
pub async fn run_interactive<G, R, W>(
    machine: &mut InteractionStateMachine<G>,
    input: R,
    out: &mut W,
    initial_task: Option<String>,
) -> Result<(), AgentError>
where
    G: GenerationService,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut pending = initial_task;

    loop {
        let task = match pending.take() {
            Some(task) => {
                writeln!(out, "\nTask: {}", task.trim())?;
                task
            }
            None => {
                write_prompt(out, TASK_PROMPT)?;
                match next_line(&mut lines).await? {
                    Some(line) => line,
                    None => break,
                }
            }
        };

        if task.trim().is_empty() {
            continue;
        }
        if is_exit_keyword(&task) {
            break;
        }

        let outcome = machine.handle(InteractionEvent::SubmitTask(task)).await;
        if !drive_task(machine, &mut lines, out, outcome).await? {
            return Ok(());
        }
    }

    machine.handle(InteractionEvent::Exit).await?;
    tracing::info!(
        records = machine.history().len(),
        generation_calls = machine.generation_calls(),
        "[Loop] Session ended"
    );
    Ok(())
}

/// Follow one task through its steps. Returns `false` when the session is over.
async fn drive_task<G, R, W>(
    machine: &mut InteractionStateMachine<G>,
    lines: &mut Lines<R>,
    out: &mut W,
    first: Result<Step, AgentError>,
) -> Result<bool, AgentError>
where
    G: GenerationService,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut outcome = first;

    loop {
        let step = match outcome {
            Ok(step) => step,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                writeln!(out, "\nError: {}", err)?;
                return Ok(true);
            }
        };

        let event = match step {
            Step::ClarificationNeeded { question } => {
                write_clarification(out, &question)?;
                write_prompt(out, CLARIFICATION_PROMPT)?;
                match next_line(lines).await? {
                    Some(answer) => InteractionEvent::AnswerClarification(answer),
                    None => InteractionEvent::Exit,
                }
            }
            Step::Solution { stage, realized } => {
                write_solution(out, stage, &realized)?;
                write_prompt(out, FEEDBACK_PROMPT)?;
                match next_line(lines).await? {
                    Some(feedback) if feedback.trim().is_empty() => {
                        InteractionEvent::DeclineFeedback
                    }
                    Some(feedback) => {
                        writeln!(out, "{}", FEEDBACK_ACK)?;
                        InteractionEvent::ProvideFeedback(feedback)
                    }
                    None => InteractionEvent::Exit,
                }
            }
            Step::RefinementExhausted { .. } => {
                writeln!(out, "{}", EXHAUSTED_MESSAGE)?;
                return Ok(true);
            }
            Step::Ready => return Ok(true),
            Step::Exited => return Ok(false),
        };

        outcome = machine.handle(event).await;
    }
}

async fn next_line<R>(lines: &mut Lines<R>) -> Result<Option<String>, AgentError>
where
    R: AsyncBufRead + Unpin,
{
    Ok(lines.next_line().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_keywords_are_case_insensitive() {
        assert!(is_exit_keyword("quit"));
        assert!(is_exit_keyword("  EXIT "));
        assert!(!is_exit_keyword("quit now"));
    }
}

//! Interaction State Types
//!
//! Defines the states, events and user-facing steps of one coding task as it
//! moves through clarification, solution display and feedback-driven
//! refinement. The transitions themselves live in `state_machine`.

use python_sandbox::ExecutionResult;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::response_parser::ParsedResponse;

/// Default number of refinement generation calls allowed per feedback round.
pub const DEFAULT_MAX_REFINEMENT_ATTEMPTS: u32 = 3;

/// Text appended to the task when the user answers a clarification.
pub const CLARIFICATION_SEPARATOR: &str = "\nUser clarification: ";
/// Text joining the task and the user's feedback on a refinement request.
pub const FEEDBACK_SEPARATOR: &str = "\nUser feedback: ";

// ============ Realized Responses ============

/// A parsed reply after the trust boundary has been applied to it.
///
/// `execution` is present exactly when `response` is a `Solution`; a
/// solution's code has been validated and (if safe) executed before a value of
/// this type exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealizedResponse {
    pub response: ParsedResponse,
    pub execution: Option<ExecutionResult>,
}

impl RealizedResponse {
    pub(crate) fn solution(response: ParsedResponse, execution: ExecutionResult) -> Self {
        Self {
            response,
            execution: Some(execution),
        }
    }

    pub(crate) fn unexecuted(response: ParsedResponse) -> Self {
        Self {
            response,
            execution: None,
        }
    }

    pub fn is_solution(&self) -> bool {
        matches!(self.response, ParsedResponse::Solution { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolutionStage {
    Generated,
    Improved,
}

impl SolutionStage {
    /// Heading prefix used when the solution is shown.
    pub fn label(&self) -> &'static str {
        match self {
            SolutionStage::Generated => "GENERATED",
            SolutionStage::Improved => "IMPROVED",
        }
    }
}

// ============ Refinement Budget ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementBudget {
    pub max_attempts: u32,
}

impl RefinementBudget {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }
}

impl Default for RefinementBudget {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REFINEMENT_ATTEMPTS)
    }
}

// ============ States ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    UserExit,
    RefinementExhausted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionState {
    AwaitingTask,
    AwaitingClarification {
        task: String,
        question: String,
    },
    /// Transient: a realized response about to be shown.
    HasSolution {
        task: String,
        realized: RealizedResponse,
    },
    AwaitingFeedback {
        task: String,
        realized: RealizedResponse,
    },
    Refining {
        task: String,
        feedback: String,
        attempts: u32,
        /// Response the feedback was given on.
        previous: ParsedResponse,
        /// Question the service asked mid-refinement, waiting for an answer.
        pending_question: Option<String>,
    },
    Terminal(TerminalReason),
}

impl InteractionState {
    pub fn name(&self) -> &'static str {
        match self {
            InteractionState::AwaitingTask => "AwaitingTask",
            InteractionState::AwaitingClarification { .. } => "AwaitingClarification",
            InteractionState::HasSolution { .. } => "HasSolution",
            InteractionState::AwaitingFeedback { .. } => "AwaitingFeedback",
            InteractionState::Refining { .. } => "Refining",
            InteractionState::Terminal(TerminalReason::UserExit) => "Terminal(UserExit)",
            InteractionState::Terminal(TerminalReason::RefinementExhausted) => {
                "Terminal(RefinementExhausted)"
            }
        }
    }

    /// Whether a new task may be submitted from this state.
    pub fn accepts_task(&self) -> bool {
        matches!(
            self,
            InteractionState::AwaitingTask
                | InteractionState::Terminal(TerminalReason::RefinementExhausted)
        )
    }

    pub fn is_session_over(&self) -> bool {
        matches!(self, InteractionState::Terminal(TerminalReason::UserExit))
    }
}

impl fmt::Display for InteractionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============ Events ============

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionEvent {
    SubmitTask(String),
    AnswerClarification(String),
    ProvideFeedback(String),
    DeclineFeedback,
    Exit,
}

impl InteractionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            InteractionEvent::SubmitTask(_) => "SubmitTask",
            InteractionEvent::AnswerClarification(_) => "AnswerClarification",
            InteractionEvent::ProvideFeedback(_) => "ProvideFeedback",
            InteractionEvent::DeclineFeedback => "DeclineFeedback",
            InteractionEvent::Exit => "Exit",
        }
    }
}

// ============ Steps ============

/// What the surface must present after an event has been handled.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// The service asked a question; answer with `AnswerClarification`.
    ClarificationNeeded { question: String },
    /// A response was realized; follow with `ProvideFeedback` or `DeclineFeedback`.
    Solution {
        stage: SolutionStage,
        realized: RealizedResponse,
    },
    /// Refinement used its whole budget without a solution.
    RefinementExhausted { attempts: u32 },
    /// Ready for the next task.
    Ready,
    Exited,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_is_exhausted_at_bound() {
        let budget = RefinementBudget::default();
        assert_eq!(budget.max_attempts, 3);
        assert!(!budget.is_exhausted(2));
        assert!(budget.is_exhausted(3));
    }

    #[test]
    fn exhausted_terminal_still_accepts_tasks() {
        assert!(InteractionState::AwaitingTask.accepts_task());
        assert!(InteractionState::Terminal(TerminalReason::RefinementExhausted).accepts_task());
        assert!(!InteractionState::Terminal(TerminalReason::UserExit).accepts_task());
        assert!(InteractionState::Terminal(TerminalReason::UserExit).is_session_over());
    }

    #[test]
    fn stage_labels() {
        assert_eq!(SolutionStage::Generated.label(), "GENERATED");
        assert_eq!(SolutionStage::Improved.label(), "IMPROVED");
    }
}

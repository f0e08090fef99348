//! Interaction State Machine
//!
//! Sequences one task through clarification, solution display and
//! feedback-driven refinement:
//!
//! ```text
//! AwaitingTask -> AwaitingClarification -> HasSolution -> AwaitingFeedback
//!                                              ^                 |
//!                                              +---- Refining <--+
//!                                                       |
//!                                                       v
//!                                         Terminal(RefinementExhausted)
//! ```
//!
//! Every solution the generation service returns goes through
//! `python_sandbox::check_and_execute` before it is shown, refinement rounds
//! included. Code is never carried across rounds.

use python_sandbox::{check_and_execute, Policy, SandboxExecutor};
use std::sync::Arc;

use crate::error::AgentError;
use crate::generation::{GenerationService, DEFAULT_SYSTEM_PROMPT};
use crate::history::InteractionHistory;
use crate::interaction_state::{
    InteractionEvent, InteractionState, RealizedResponse, RefinementBudget, SolutionStage, Step,
    TerminalReason, CLARIFICATION_SEPARATOR, FEEDBACK_SEPARATOR,
};
use crate::response_parser::{parse, MalformedReason, ParsedResponse};

pub const DEFAULT_MAX_TOKENS: u32 = 1500;

#[derive(Debug, Clone)]
pub struct InteractionConfig {
    pub system_prompt: String,
    pub max_tokens: u32,
    pub budget: RefinementBudget,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            budget: RefinementBudget::default(),
        }
    }
}

pub struct InteractionStateMachine<G> {
    generator: G,
    policy: Arc<Policy>,
    executor: SandboxExecutor,
    config: InteractionConfig,
    current_state: InteractionState,
    /// Names of the states entered for the current task, oldest first.
    /// Cleared whenever a new task is submitted.
    state_trace: Vec<&'static str>,
    history: InteractionHistory,
    generation_calls: u64,
}

impl<G: GenerationService> InteractionStateMachine<G> {
    pub fn new(
        generator: G,
        policy: Arc<Policy>,
        executor: SandboxExecutor,
        config: InteractionConfig,
    ) -> Self {
        let current_state = InteractionState::AwaitingTask;
        Self {
            generator,
            policy,
            executor,
            config,
            state_trace: vec![current_state.name()],
            current_state,
            history: InteractionHistory::new(),
            generation_calls: 0,
        }
    }

    pub fn state(&self) -> &InteractionState {
        &self.current_state
    }

    pub fn state_trace(&self) -> &[&'static str] {
        &self.state_trace
    }

    pub fn history(&self) -> &InteractionHistory {
        &self.history
    }

    pub fn generation_calls(&self) -> u64 {
        self.generation_calls
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Apply one user event.
    ///
    /// An event that does not fit the current state is rejected with
    /// `UnexpectedEvent` and the state is left as it was. A failed generation
    /// call abandons the task and returns the machine to `AwaitingTask`.
    pub async fn handle(&mut self, event: InteractionEvent) -> Result<Step, AgentError> {
        let state = std::mem::replace(&mut self.current_state, InteractionState::AwaitingTask);

        match (state, event) {
            (_, InteractionEvent::Exit) => {
                self.transition_to(InteractionState::Terminal(TerminalReason::UserExit));
                Ok(Step::Exited)
            }

            (state, InteractionEvent::SubmitTask(task)) if state.accepts_task() => {
                self.reset_trace(state.name());
                self.start_task(task).await
            }

            (
                InteractionState::AwaitingClarification { task, .. },
                InteractionEvent::AnswerClarification(answer),
            ) => {
                let task = format!("{}{}{}", task, CLARIFICATION_SEPARATOR, answer.trim());
                self.resume_with_clarification(task).await
            }

            (
                InteractionState::AwaitingFeedback { task, realized },
                InteractionEvent::ProvideFeedback(feedback),
            ) if !feedback.trim().is_empty() => {
                self.refine(task, feedback.trim().to_string(), 0, realized.response)
                    .await
            }

            (
                InteractionState::AwaitingFeedback { task, realized },
                InteractionEvent::ProvideFeedback(_) | InteractionEvent::DeclineFeedback,
            ) => {
                self.history.append(task, realized.response, None);
                self.transition_to(InteractionState::AwaitingTask);
                Ok(Step::Ready)
            }

            (
                InteractionState::Refining {
                    task,
                    feedback,
                    attempts,
                    previous,
                    pending_question: Some(_),
                },
                InteractionEvent::AnswerClarification(answer),
            ) => {
                let feedback = format!("{}{}{}", feedback, CLARIFICATION_SEPARATOR, answer.trim());
                self.refine(task, feedback, attempts, previous).await
            }

            (state, event) => {
                let err = AgentError::UnexpectedEvent {
                    state: state.name(),
                    event: event.name(),
                };
                tracing::warn!(error = %err, "[StateMachine] Event rejected");
                self.current_state = state;
                Err(err)
            }
        }
    }

    /// Reset the trace for a new task, seeded with the state it was submitted from.
    fn reset_trace(&mut self, from: &'static str) {
        self.state_trace.clear();
        self.state_trace.push(from);
    }

    fn transition_to(&mut self, new_state: InteractionState) {
        self.state_trace.push(new_state.name());
        tracing::debug!(
            state = new_state.name(),
            depth = self.state_trace.len(),
            "[StateMachine] Transitioned"
        );
        self.current_state = new_state;
    }

    async fn start_task(&mut self, task: String) -> Result<Step, AgentError> {
        let task = task.trim().to_string();
        if task.is_empty() {
            self.transition_to(InteractionState::AwaitingTask);
            return Ok(Step::Ready);
        }

        let reply = self.generate(&task).await?;
        match parse(&reply) {
            ParsedResponse::Clarification { question } => {
                self.transition_to(InteractionState::AwaitingClarification {
                    task,
                    question: question.clone(),
                });
                Ok(Step::ClarificationNeeded { question })
            }
            parsed => self.present(task, parsed, SolutionStage::Generated).await,
        }
    }

    async fn resume_with_clarification(&mut self, task: String) -> Result<Step, AgentError> {
        let reply = self.generate(&task).await?;
        let parsed = match parse(&reply) {
            // One clarification round per task; a second question is shown
            // as a reply without code.
            ParsedResponse::Clarification { question } => ParsedResponse::Malformed {
                reason: MalformedReason::NoCodeGenerated,
                explanation: Some(question),
                raw: reply,
            },
            parsed => parsed,
        };
        self.present(task, parsed, SolutionStage::Generated).await
    }

    /// Run refinement generation calls until a solution arrives, the
    /// service asks a question, or the budget is spent.
    async fn refine(
        &mut self,
        task: String,
        feedback: String,
        mut attempts: u32,
        previous: ParsedResponse,
    ) -> Result<Step, AgentError> {
        loop {
            if self.config.budget.is_exhausted(attempts) {
                tracing::warn!(attempts, "[StateMachine] Refinement budget exhausted");
                self.transition_to(InteractionState::Terminal(
                    TerminalReason::RefinementExhausted,
                ));
                return Ok(Step::RefinementExhausted { attempts });
            }

            self.history
                .append(task.clone(), previous.clone(), Some(feedback.clone()));
            self.transition_to(InteractionState::Refining {
                task: task.clone(),
                feedback: feedback.clone(),
                attempts,
                previous: previous.clone(),
                pending_question: None,
            });

            let prompt = format!("{}{}{}", task, FEEDBACK_SEPARATOR, feedback);
            let reply = self.generate(&prompt).await?;

            match parse(&reply) {
                parsed @ ParsedResponse::Solution { .. } => {
                    return self.present(task, parsed, SolutionStage::Improved).await;
                }
                ParsedResponse::Clarification { question } => {
                    attempts += 1;
                    if self.config.budget.is_exhausted(attempts) {
                        continue;
                    }
                    self.transition_to(InteractionState::Refining {
                        task,
                        feedback,
                        attempts,
                        previous,
                        pending_question: Some(question.clone()),
                    });
                    return Ok(Step::ClarificationNeeded { question });
                }
                ParsedResponse::Malformed { reason, .. } => {
                    attempts += 1;
                    tracing::warn!(
                        reason = %reason,
                        attempts,
                        "[StateMachine] Unexpected reply format during refinement"
                    );
                }
            }
        }
    }

    async fn present(
        &mut self,
        task: String,
        parsed: ParsedResponse,
        stage: SolutionStage,
    ) -> Result<Step, AgentError> {
        let realized = self.realize(parsed).await;
        self.transition_to(InteractionState::HasSolution {
            task: task.clone(),
            realized: realized.clone(),
        });
        self.transition_to(InteractionState::AwaitingFeedback {
            task,
            realized: realized.clone(),
        });
        Ok(Step::Solution { stage, realized })
    }

    /// Pass a solution's code through the sandbox. Other replies are
    /// never executed.
    async fn realize(&self, parsed: ParsedResponse) -> RealizedResponse {
        let execution = match &parsed {
            ParsedResponse::Solution { code, .. } => {
                Some(check_and_execute(code, &self.policy, &self.executor).await)
            }
            _ => None,
        };
        match execution {
            Some(execution) => RealizedResponse::solution(parsed, execution),
            None => {
                tracing::info!(kind = parsed.kind(), "[StateMachine] Reply not executed");
                RealizedResponse::unexecuted(parsed)
            }
        }
    }

    async fn generate(&mut self, prompt: &str) -> Result<String, AgentError> {
        self.generation_calls += 1;
        tracing::info!(
            call = self.generation_calls,
            "[StateMachine] Requesting generation"
        );
        match self
            .generator
            .generate(&self.config.system_prompt, prompt, self.config.max_tokens)
            .await
        {
            Ok(reply) => Ok(reply),
            Err(err) => {
                tracing::error!(error = %err, "[StateMachine] Generation failed, task abandoned");
                self.transition_to(InteractionState::AwaitingTask);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::ScriptedGenerator;

    fn machine(replies: Vec<&str>) -> InteractionStateMachine<ScriptedGenerator> {
        InteractionStateMachine::new(
            ScriptedGenerator::new(replies),
            Arc::new(Policy::default()),
            SandboxExecutor::default(),
            InteractionConfig::default(),
        )
    }

    #[tokio::test]
    async fn feedback_before_any_task_is_rejected() {
        let mut sm = machine(vec![]);
        let err = sm
            .handle(InteractionEvent::ProvideFeedback("faster".into()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AgentError::UnexpectedEvent {
                state: "AwaitingTask",
                event: "ProvideFeedback"
            }
        ));
        assert_eq!(sm.state(), &InteractionState::AwaitingTask);
        assert_eq!(sm.generation_calls(), 0);
    }

    #[tokio::test]
    async fn clarification_then_answer_reaches_feedback() {
        let mut sm = machine(vec![
            "[CLARIFICATION] Ascending or descending?",
            "[CODE]\n```python\nimport os\n```\n[EXPLANATION]\nNope.",
        ]);

        let step = sm
            .handle(InteractionEvent::SubmitTask("sort numbers".into()))
            .await
            .unwrap();
        assert_eq!(
            step,
            Step::ClarificationNeeded {
                question: "Ascending or descending?".into()
            }
        );

        let step = sm
            .handle(InteractionEvent::AnswerClarification("ascending".into()))
            .await
            .unwrap();
        match step {
            Step::Solution { stage, realized } => {
                assert_eq!(stage, SolutionStage::Generated);
                assert!(realized.execution.is_some());
            }
            other => panic!("unexpected step {:?}", other),
        }
        assert_eq!(
            sm.generator().prompts()[1],
            "sort numbers\nUser clarification: ascending"
        );
        assert_eq!(
            sm.state_trace(),
            &[
                "AwaitingTask",
                "AwaitingClarification",
                "HasSolution",
                "AwaitingFeedback"
            ]
        );
    }

    #[tokio::test]
    async fn trace_covers_only_the_latest_task() {
        let mut sm = machine(vec![
            "[CODE]\n```python\nimport os\n```\n[EXPLANATION]\nNope.",
            "[CLARIFICATION] Which file?",
        ]);

        sm.handle(InteractionEvent::SubmitTask("list files".into()))
            .await
            .unwrap();
        sm.handle(InteractionEvent::DeclineFeedback).await.unwrap();
        assert_eq!(
            sm.state_trace(),
            &["AwaitingTask", "HasSolution", "AwaitingFeedback", "AwaitingTask"]
        );

        sm.handle(InteractionEvent::SubmitTask("read a file".into()))
            .await
            .unwrap();
        assert_eq!(sm.state_trace(), &["AwaitingTask", "AwaitingClarification"]);
    }

    #[tokio::test]
    async fn generation_failure_returns_to_awaiting_task() {
        let mut sm = machine(vec![]);
        let err = sm
            .handle(InteractionEvent::SubmitTask("anything".into()))
            .await
            .unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(sm.state(), &InteractionState::AwaitingTask);
    }

    #[tokio::test]
    async fn exit_ends_the_session() {
        let mut sm = machine(vec![]);
        assert_eq!(sm.handle(InteractionEvent::Exit).await.unwrap(), Step::Exited);
        assert!(sm.state().is_session_over());
        assert!(sm
            .handle(InteractionEvent::SubmitTask("more".into()))
            .await
            .is_err());
    }
}

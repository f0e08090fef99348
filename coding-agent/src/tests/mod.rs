//! End-to-end interaction tests.
//!
//! These drive the state machine and the interactive loop with a scripted
//! generation service, so no network access or credential is needed. Tests
//! that execute safe code need `python3` (or `python` on Windows) on PATH.


use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::AgentError;
use crate::generation::GenerationService;

/// Replays canned replies in order and records every prompt it is given.
/// An exhausted script fails the call with `EmptyReply`.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationService for ScriptedGenerator {
    async fn generate(
        &self,
        _system: &str,
        prompt: &str,
        _max_tokens: u32,
    ) -> Result<String, AgentError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.replies.lock().unwrap().pop_front();
        next.ok_or(AgentError::EmptyReply)
    }
}

/// A well-formed reply carrying `code`.
pub fn solution_reply(code: &str, explanation: &str) -> String {
    format!(
        "[CODE]\n```python\n{}\n```\n[EXPLANATION]\n{}",
        code, explanation
    )
}

//! The generation-service seam.
//!
//! The interaction state machine only ever sees [`GenerationService`]: a
//! system instruction plus a user prompt plus a token budget in, one reply
//! string out. [`OpenAiChatClient`] is the production implementation.

pub mod openai_client;
pub mod request_builder;

pub use openai_client::{OpenAiChatClient, OpenAiClientConfig};

use async_trait::async_trait;

use crate::error::AgentError;

/// Instruction sent with every request unless overridden by settings or CLI.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are an expert Python developer. Follow these rules:
1. If the request is unclear, ask ONE clarifying question.
2. Generate production-quality code with error handling, type hints, docstrings and a modular structure.
3. Explain the code: functionality overview, performance analysis, assumptions, complexity analysis.
4. Use secure coding practices. Do not import os, sys or subprocess.
5. Format the response as either:
[CLARIFICATION] <question>
or:
[CODE]
```python
<code>
```
[EXPLANATION]
<detailed explanation>";

#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(
        &self,
        system: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, AgentError>;
}


use async_trait::async_trait;
use std::time::Duration;

use super::request_builder::build_chat_request_body;
use super::GenerationService;
use crate::error::AgentError;
use crate::protocol::ChatCompletionResponse;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct OpenAiClientConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub request_timeout: Duration,
}

impl OpenAiClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

/// Chat completions client for OpenAI and compatible servers.
#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    http: reqwest::Client,
    config: OpenAiClientConfig,
}

impl OpenAiChatClient {
    pub fn new(config: OpenAiClientConfig) -> Result<Self, AgentError> {
        if config.api_key.trim().is_empty() {
            return Err(AgentError::MissingCredential {
                var: "OPENAI_API_KEY",
            });
        }
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl GenerationService for OpenAiChatClient {
    async fn generate(
        &self,
        system: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, AgentError> {
        let body = build_chat_request_body(
            &self.config.model,
            system,
            prompt,
            self.config.temperature,
            max_tokens,
        );

        tracing::info!(
            model = %self.config.model,
            prompt_chars = prompt.len(),
            max_tokens,
            "[Generation] Sending completion request"
        );

        let response = self
            .http
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "[Generation] Request rejected");
            return Err(AgentError::GenerationStatus {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        if let Some(usage) = completion.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "[Generation] Usage"
            );
        }
        if let Some(reason) = completion.first_finish_reason() {
            if reason == "length" {
                tracing::warn!(finish_reason = reason, "[Generation] Reply truncated");
            } else {
                tracing::debug!(finish_reason = reason, "[Generation] Finished");
            }
        }

        match completion.first_content() {
            Some(content) if !content.trim().is_empty() => {
                tracing::info!(reply_chars = content.len(), "[Generation] Reply received");
                Ok(content.to_string())
            }
            _ => Err(AgentError::EmptyReply),
        }
    }
}

use python_sandbox::executor::DEFAULT_MAX_OUTPUT_BYTES;
use python_sandbox::policy::{DEFAULT_DENIED_MODULES, DEFAULT_TIMEOUT};
use python_sandbox::process::default_python_command;
use python_sandbox::{ExecutorConfig, Policy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::error::AgentError;
use crate::generation::openai_client::{
    DEFAULT_API_BASE, DEFAULT_MODEL, DEFAULT_REQUEST_TIMEOUT, DEFAULT_TEMPERATURE,
};
use crate::generation::{OpenAiClientConfig, DEFAULT_SYSTEM_PROMPT};
use crate::interaction_state::{RefinementBudget, DEFAULT_MAX_REFINEMENT_ATTEMPTS};
use crate::paths::{default_log_dir, get_config_path};
use crate::state_machine::{InteractionConfig, DEFAULT_MAX_TOKENS};

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_denied_modules() -> Vec<String> {
    DEFAULT_DENIED_MODULES.iter().map(|m| m.to_string()).collect()
}

fn default_execution_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_python_command_string() -> String {
    default_python_command().to_string()
}

fn default_max_refinement_attempts() -> u32 {
    DEFAULT_MAX_REFINEMENT_ATTEMPTS
}

fn default_max_output_bytes() -> usize {
    DEFAULT_MAX_OUTPUT_BYTES
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

fn default_log_dir_path() -> PathBuf {
    default_log_dir()
}

/// Persistent agent settings, read from a JSON file.
///
/// Every field has a default so a partial file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_denied_modules")]
    pub denied_modules: Vec<String>,
    /// Reserved. Carried into the policy but not enforced.
    #[serde(default)]
    pub allowed_functions: Vec<String>,
    #[serde(default = "default_execution_timeout_secs")]
    pub execution_timeout_secs: u64,
    #[serde(default = "default_python_command_string")]
    pub python_command: String,
    #[serde(default = "default_max_refinement_attempts")]
    pub max_refinement_attempts: u32,
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_log_dir_path")]
    pub log_dir: PathBuf,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_base_url: default_api_base_url(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            system_prompt: default_system_prompt(),
            denied_modules: default_denied_modules(),
            allowed_functions: Vec::new(),
            execution_timeout_secs: default_execution_timeout_secs(),
            python_command: default_python_command_string(),
            max_refinement_attempts: default_max_refinement_attempts(),
            max_output_bytes: default_max_output_bytes(),
            request_timeout_secs: default_request_timeout_secs(),
            log_dir: default_log_dir_path(),
        }
    }
}

impl AgentSettings {
    /// Build the immutable sandbox policy these settings describe.
    pub fn policy(&self) -> Policy {
        let policy = Policy::new()
            .with_timeout(Duration::from_secs(self.execution_timeout_secs))
            .with_denied_modules(self.denied_modules.iter().cloned());
        self.allowed_functions
            .iter()
            .fold(policy, |policy, name| policy.allow_function(name.clone()))
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            python_command: self.python_command.clone(),
            scratch_dir: None,
            max_output_bytes: self.max_output_bytes,
        }
    }

    pub fn interaction_config(&self) -> InteractionConfig {
        InteractionConfig {
            system_prompt: self.system_prompt.clone(),
            max_tokens: self.max_tokens,
            budget: RefinementBudget::new(self.max_refinement_attempts),
        }
    }

    pub fn client_config(&self, api_key: impl Into<String>) -> OpenAiClientConfig {
        OpenAiClientConfig {
            api_base: self.api_base_url.clone(),
            api_key: api_key.into(),
            model: self.model.clone(),
            temperature: self.temperature,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

/// Load settings from `explicit` or, when `None`, from the default location.
///
/// A missing default file yields defaults. An explicit file that cannot be
/// read, or any file that is not valid JSON, is an error.
pub async fn load_settings(explicit: Option<&Path>) -> Result<AgentSettings, AgentError> {
    let config_path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(get_config_path);

    let contents = match fs::read_to_string(&config_path).await {
        Ok(contents) => contents,
        Err(e) if explicit.is_none() && e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %config_path.display(), "[Settings] No settings file, using defaults");
            return Ok(AgentSettings::default());
        }
        Err(source) => {
            return Err(AgentError::ReadFile {
                path: config_path,
                source,
            })
        }
    };

    let settings = serde_json::from_str(&contents).map_err(|source| {
        AgentError::InvalidSettings {
            path: config_path.clone(),
            source,
        }
    })?;
    tracing::info!(path = %config_path.display(), "[Settings] Loaded");
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = AgentSettings::default();
        assert_eq!(settings.model, "gpt-4");
        assert_eq!(settings.max_tokens, 1500);
        assert!((settings.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(settings.execution_timeout_secs, 5);
        assert_eq!(settings.max_refinement_attempts, 3);
        assert_eq!(settings.denied_modules, vec!["os", "sys", "subprocess"]);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let settings: AgentSettings =
            serde_json::from_str(r#"{"model": "gpt-4o", "denied_modules": ["socket"]}"#).unwrap();
        assert_eq!(settings.model, "gpt-4o");
        assert_eq!(settings.denied_modules, vec!["socket"]);
        assert_eq!(settings.max_tokens, 1500);
    }

    #[test]
    fn policy_reflects_settings() {
        let settings = AgentSettings {
            denied_modules: vec!["socket".into(), "ctypes".into()],
            execution_timeout_secs: 2,
            ..AgentSettings::default()
        };
        let policy = settings.policy();
        assert!(policy.is_denied("socket"));
        assert!(policy.is_denied("ctypes.util"));
        assert!(!policy.is_denied("os"));
        assert_eq!(policy.timeout(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let err = load_settings(Some(&missing)).await.unwrap_err();
        assert!(matches!(err, AgentError::ReadFile { .. }));
    }

    #[tokio::test]
    async fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"max_refinement_attempts": 5}"#).unwrap();
        let settings = load_settings(Some(&path)).await.unwrap();
        assert_eq!(settings.max_refinement_attempts, 5);
        assert_eq!(settings.interaction_config().budget.max_attempts, 5);
    }

    #[tokio::test]
    async fn invalid_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_settings(Some(&path)).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidSettings { .. }));
    }
}

//! Command-line argument parsing and launch configuration.
//!
//! This module handles CLI argument parsing using clap, and applies
//! launch-time overrides on top of the settings file.

use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AgentError;
use crate::settings::AgentSettings;

/// CLI arguments for coding-agent
#[derive(Parser, Debug, Clone)]
#[command(
    name = "coding-agent",
    version,
    about = "Turns coding requests into Python, checks it, and runs it in a time-boxed sandbox"
)]
pub struct CliArgs {
    /// Settings file (JSON). Defaults to <config dir>/coding-agent/settings.json
    #[arg(long, value_name = "PATH", env = "CODING_AGENT_CONFIG")]
    pub config: Option<PathBuf>,
    /// Model name sent to the generation service
    #[arg(long, value_name = "MODEL", env = "CODING_AGENT_MODEL")]
    pub model: Option<String>,
    /// Base URL of an OpenAI-compatible API
    #[arg(long, value_name = "URL", env = "CODING_AGENT_API_BASE")]
    pub api_base: Option<String>,
    /// Credential for the generation service
    #[arg(long, value_name = "KEY", env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
    /// Override the system instruction (string or @path/to/file)
    #[arg(long, value_name = "PROMPT_OR_@FILE", env = "CODING_AGENT_SYSTEM_PROMPT")]
    pub system_prompt: Option<String>,
    /// Task to run before the interactive prompt (string or @path/to/file)
    #[arg(long, value_name = "TASK_OR_@FILE")]
    pub task: Option<String>,
    /// Only validate a Python file against the policy and exit (0 safe, 2 unsafe)
    #[arg(long, value_name = "FILE")]
    pub check: Option<PathBuf>,
    /// Denied top-level modules, replacing the configured set (e.g. os,sys,subprocess)
    #[arg(
        long,
        value_delimiter = ',',
        value_name = "MODULE[,MODULE...]",
        env = "CODING_AGENT_DENY"
    )]
    pub deny: Option<Vec<String>>,
    /// Interpreter used to run generated code
    #[arg(long, value_name = "COMMAND", env = "CODING_AGENT_PYTHON")]
    pub python: Option<String>,
    /// Wall-clock limit for one execution, in seconds
    #[arg(long, value_name = "SECS", env = "CODING_AGENT_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,
    /// Refinement generation calls allowed per feedback round
    #[arg(long, value_name = "N", env = "CODING_AGENT_MAX_REFINEMENTS")]
    pub max_refinements: Option<u32>,
    /// Directory for coding-agent.log
    #[arg(long, value_name = "DIR", env = "CODING_AGENT_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
    /// Also write logs to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Read a value that may be inline text or an `@path` reference.
pub fn read_value_or_file(raw: &str) -> Result<String, AgentError> {
    match raw.strip_prefix('@') {
        Some(path) => fs::read_to_string(Path::new(path)).map_err(|source| AgentError::ReadFile {
            path: PathBuf::from(path),
            source,
        }),
        None => Ok(raw.to_string()),
    }
}

/// Apply CLI overrides to settings. CLI values win over the settings file.
pub fn apply_cli_overrides(args: &CliArgs, settings: &mut AgentSettings) -> Result<(), AgentError> {
    if let Some(model) = &args.model {
        tracing::info!(model = %model, "[CLI] Model override");
        settings.model = model.clone();
    }
    if let Some(api_base) = &args.api_base {
        settings.api_base_url = api_base.clone();
    }
    if let Some(raw) = &args.system_prompt {
        settings.system_prompt = read_value_or_file(raw)?;
        tracing::info!(
            chars = settings.system_prompt.len(),
            "[CLI] System prompt override"
        );
    }
    if let Some(deny) = &args.deny {
        settings.denied_modules = deny
            .iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        tracing::info!(denied = ?settings.denied_modules, "[CLI] Denied modules override");
    }
    if let Some(python) = &args.python {
        settings.python_command = python.clone();
    }
    if let Some(secs) = args.timeout_secs {
        settings.execution_timeout_secs = secs;
    }
    if let Some(max) = args.max_refinements {
        settings.max_refinement_attempts = max;
    }
    if let Some(dir) = &args.log_dir {
        settings.log_dir = dir.clone();
    }
    Ok(())
}

/// The `--task` value with any `@file` reference resolved.
pub fn initial_task(args: &CliArgs) -> Result<Option<String>, AgentError> {
    args.task.as_deref().map(read_value_or_file).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        let mut argv = vec!["coding-agent"];
        argv.extend_from_slice(args);
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn inline_value_is_returned_verbatim() {
        assert_eq!(read_value_or_file("hello").unwrap(), "hello");
    }

    #[test]
    fn at_prefix_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.txt");
        fs::write(&path, "from file").unwrap();
        let raw = format!("@{}", path.display());
        assert_eq!(read_value_or_file(&raw).unwrap(), "from file");
    }

    #[test]
    fn missing_at_file_is_an_error() {
        let err = read_value_or_file("@/definitely/not/here.txt").unwrap_err();
        assert!(matches!(err, AgentError::ReadFile { .. }));
    }

    #[test]
    fn overrides_replace_settings() {
        let args = parse(&[
            "--model",
            "gpt-4o-mini",
            "--deny",
            "socket, ctypes",
            "--timeout-secs",
            "9",
            "--max-refinements",
            "1",
            "--python",
            "/usr/bin/python3",
        ]);
        let mut settings = AgentSettings::default();
        apply_cli_overrides(&args, &mut settings).unwrap();

        assert_eq!(settings.model, "gpt-4o-mini");
        assert_eq!(settings.denied_modules, vec!["socket", "ctypes"]);
        assert_eq!(settings.execution_timeout_secs, 9);
        assert_eq!(settings.max_refinement_attempts, 1);
        assert_eq!(settings.python_command, "/usr/bin/python3");
    }

    #[test]
    fn absent_flags_leave_settings_alone() {
        let args = parse(&[]);
        let mut settings = AgentSettings::default();
        let before = settings.clone();
        apply_cli_overrides(&args, &mut settings).unwrap();
        assert_eq!(settings.denied_modules, before.denied_modules);
        assert_eq!(settings.max_refinement_attempts, before.max_refinement_attempts);
    }

    #[test]
    fn task_resolves_inline_text() {
        let args = parse(&["--task", "reverse a string"]);
        assert_eq!(initial_task(&args).unwrap().as_deref(), Some("reverse a string"));
    }
}

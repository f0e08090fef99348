pub mod cli;
pub mod display;
pub mod error;
pub mod generation;
pub mod history;
pub mod interaction_state;
pub mod interactive_loop;
pub mod logging;
pub mod paths;
pub mod protocol;
pub mod response_parser;
pub mod settings;
pub mod state_machine;

#[cfg(test)]
mod tests;

use anyhow::Context;
use python_sandbox::{validate, Policy, SandboxExecutor, ValidationOutcome};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::BufReader;

use cli::{apply_cli_overrides, initial_task, CliArgs};
use display::write_check_outcome;
use error::AgentError;
use generation::OpenAiChatClient;
use interactive_loop::run_interactive;
use logging::init_tracing;
use settings::load_settings;
use state_machine::InteractionStateMachine;

/// Exit status of `--check` when the file would be blocked.
pub const EXIT_UNSAFE: u8 = 2;

pub async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    let mut settings = load_settings(args.config.as_deref()).await?;
    apply_cli_overrides(&args, &mut settings)?;
    init_tracing(&settings.log_dir, args.verbose)?;

    let policy = Arc::new(settings.policy());
    tracing::info!(
        denied = ?policy.denied_modules(),
        timeout_secs = policy.timeout().as_secs(),
        "[Startup] Policy loaded"
    );

    if let Some(path) = &args.check {
        return check_file(path, &policy);
    }

    // The credential is checked before any prompt is shown.
    let api_key = args
        .api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
        .ok_or(AgentError::MissingCredential {
            var: "OPENAI_API_KEY",
        })?;
    let client = OpenAiChatClient::new(settings.client_config(api_key))?;
    tracing::info!(model = client.model(), "[Startup] Generation client ready");

    let executor = SandboxExecutor::new(settings.executor_config());
    let mut machine =
        InteractionStateMachine::new(client, policy, executor, settings.interaction_config());

    let task = initial_task(&args)?;
    let input = BufReader::new(tokio::io::stdin());
    let mut out = std::io::stdout();
    run_interactive(&mut machine, input, &mut out, task).await?;

    Ok(ExitCode::SUCCESS)
}

fn check_file(path: &Path, policy: &Policy) -> anyhow::Result<ExitCode> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let outcome = validate(&source, policy);

    let mut out = std::io::stdout();
    write_check_outcome(&mut out, &path.display().to_string(), &outcome)?;

    Ok(match outcome {
        ValidationOutcome::Safe(_) => ExitCode::SUCCESS,
        ValidationOutcome::Unsafe { .. } => ExitCode::from(EXIT_UNSAFE),
    })
}

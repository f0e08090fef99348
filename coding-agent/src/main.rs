use clap::Parser;
use coding_agent_lib::cli::CliArgs;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // .env must be loaded before clap reads its env fallbacks
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();

    coding_agent_lib::run(args).await
}

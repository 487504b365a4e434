use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use csv_embed_pipeline::{AppConfig, app, cli::Cli, config};
use tracing::{debug, error, warn};
use workflow_runner::ExecutionOutcome;

async fn try_main(cli: Cli) -> anyhow::Result<ExecutionOutcome> {
    let cfg = AppConfig::from_env().context("loading configuration")?;
    let outcome = app::run(cfg, &cli).await.context("running pipeline")?;
    Ok(outcome)
}

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = config::load_dotenv();
    ai_llm_service::telemetry::init("info");
    match dotenv {
        Ok(Some(path)) => debug!(path = %path.display(), ".env loaded"),
        Ok(None) => {}
        Err(e) => warn!(error = %e, ".env could not be parsed, ignoring it"),
    }

    let cli = Cli::parse();
    match try_main(cli).await {
        Ok(outcome) if outcome.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

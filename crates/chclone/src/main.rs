use std::sync::Arc;

use tracing::error;

use chclone_core::{config::Config, orchestrator::Orchestrator, pacing::TokioSleeper};

#[tokio::main]
async fn main() -> Result<(), chclone_core::Error> {
    chclone_core::logging::init("chclone")?;

    let cfg = Config::load()?;
    let client = chclone_telegram::connect(&cfg);
    let orchestrator = Orchestrator::new(cfg.run_config(), client, Arc::new(TokioSleeper));

    // Outcomes are only reported through the log; exit normally either way.
    if let Err(e) = orchestrator.run_with_restart().await {
        error!("An error occurred: {e}");
    }

    Ok(())
}

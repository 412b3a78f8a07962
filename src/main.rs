//! Run a hosted image model
//!
//! Loads the Replicate API token from the environment (or a local `.env`
//! file), generates one image with a fixed prompt and saves it as
//! `output.png`.

mod core;
mod models;

use crate::core::config::Config;
use crate::core::constants::output;
use crate::core::logging::init_logging;
use crate::core::providers::ReplicateProvider;
use crate::core::runner::Runner;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Run failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // A missing .env file is fine, the variables may already be exported
    dotenv::dotenv().ok();

    let config = Config::from_env().context("Configuration error")?;

    init_logging(&config.log_level);

    let provider = ReplicateProvider::new(
        config.api_token.clone(),
        config.base_url.clone(),
        config.request_timeout,
        config.poll_interval,
    )?;

    let runner = Runner::new(Arc::new(provider), output::PATH);
    debug!("Output path: {}", runner.output_path().display());

    let report = runner.run().await?;
    info!(
        "Saved {} bytes to {}",
        report.bytes_written,
        report.path.display()
    );

    Ok(())
}

mod config;
mod error;
mod extract;
mod fetch;
mod matcher;
mod models;
mod pipeline;
mod rules;
mod scoring;
mod text;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::{Command, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.default_log_filter())),
        )
        .init();

    match config.resolved_command() {
        Command::Run => pipeline::execute(&config.run).await?,
        Command::Sort { output } => {
            let rows = pipeline::sorter::sort_output(&output)?;
            tracing::info!("{rows} rows in {}", output.display());
        }
    }

    Ok(())
}

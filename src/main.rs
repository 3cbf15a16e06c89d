use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;
mod db;
mod embeddings;
mod errors;
mod knowledge;
mod setups;
mod vector;

use cli::Cli;
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    // Structured JSON logging, filter from RUST_LOG
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "chartsage starting up");

    let db = db::Database::new(&config.database.url).await?;
    db.health_check().await?;
    db.check_pgvector().await?;

    let cli = Cli::parse();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    cli::run(cli, db, config).await?;

    info!("chartsage completed successfully");
    Ok(())
}

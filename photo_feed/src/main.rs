//! Main entry point for the photo feed service.

use anyhow::{Context, Result};
use clap::Parser;
use photo_feed::{
    cli,
    refresh::{RefreshConfig, RefreshWorker},
    server,
    settings::Settings,
    source::HttpPhotoSource,
    store::PhotoStore,
    telemetry,
};
use std::{sync::Arc, time::Duration};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    args.command.apply_overrides(&mut settings);
    settings.validate()?;

    telemetry::init(&settings.logging)?;

    match args.command {
        cli::Commands::Serve { .. } => server::serve(&settings).await,
        cli::Commands::Fetch { .. } => fetch_once(&settings).await,
    }
}

/// Run one refresh cycle against an empty store and print the report.
async fn fetch_once(settings: &Settings) -> Result<()> {
    let store = Arc::new(PhotoStore::new());
    let source = HttpPhotoSource::new(
        settings.refresh.source_url.clone(),
        Duration::from_secs(settings.refresh.timeout_seconds),
    )?;
    let worker = RefreshWorker::new(store, Arc::new(source), RefreshConfig::from(&settings.refresh));

    let report = worker
        .run_cycle()
        .await
        .with_context(|| format!("Fetching {} failed", settings.refresh.source_url))?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

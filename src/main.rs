//! CLI entry point for the catalog harvester.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use harvester_core::{
    ArtifactStore, Collector, Downloader, HarvestConfig, HttpClient, PageSource, SearchClient,
    StoreError,
};
use tracing::{debug, info, warn};

mod cli;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let config = Arc::new(load_config(&args)?);
    let client = HttpClient::new(&config.http).context("failed to build HTTP client")?;

    match args.command {
        Command::Collect => collect(&config, client).await,
        Command::Download => download(&config, client).await,
        Command::Run => {
            collect(&config, client.clone()).await?;
            download(&config, client).await
        }
    }
}

fn load_config(args: &Args) -> Result<HarvestConfig> {
    let config = match &args.config {
        Some(path) => HarvestConfig::from_json_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => HarvestConfig::default(),
    };
    let config = args.apply_overrides(config);
    config.validate().context("invalid configuration")?;
    Ok(config)
}

async fn collect(config: &Arc<HarvestConfig>, client: HttpClient) -> Result<()> {
    let source: Arc<dyn PageSource> = Arc::new(SearchClient::new(client, config)?);
    let mut collector = Collector::new(Arc::clone(config), source)?;
    let report = collector.collect().await?;

    if report.is_short() {
        warn!(
            collected = report.records.len(),
            target = report.target_count,
            "collection ended below target"
        );
    }
    info!(
        pages_fetched = report.pages_fetched,
        pages_failed = report.pages_failed,
        stop_reason = ?report.stop_reason,
        fallback = report.fallback_attempted,
        "collection finished"
    );

    println!(
        "Collected {} of {} documents",
        report.records.len(),
        report.target_count
    );
    println!("Listing: {}", report.artifacts.listing.display());
    println!("Records: {}", report.artifacts.records.display());
    Ok(())
}

async fn download(config: &Arc<HarvestConfig>, client: HttpClient) -> Result<()> {
    let store = ArtifactStore::from_config(config);
    let records = match store.load_records().await {
        Ok(records) => records,
        Err(StoreError::MissingArtifact { path }) => {
            println!(
                "No record file at {}; run `harvester collect` first.",
                path.display()
            );
            return Ok(());
        }
        Err(error) => return Err(error.into()),
    };
    if records.is_empty() {
        println!("No records to download; run `harvester collect` first.");
        return Ok(());
    }

    let downloader = Downloader::new(Arc::clone(config), client)?;
    let summary = downloader.download_all(&records).await?;

    println!(
        "Downloaded {}/{} documents ({} already present, {} failed)",
        summary.succeeded, summary.total, summary.skipped, summary.failed
    );
    println!("Log: {}", config.download_log_path().display());
    Ok(())
}

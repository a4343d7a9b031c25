use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use notion_md_sync::config;
use notion_md_sync::image::HttpImageFetcher;
use notion_md_sync::notion::NotionClient;
use notion_md_sync::sync::Syncer;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Sync published Notion pages to Markdown files and exit"
)]
struct Args {
    /// Path to YAML config file (defaults to ./notion-sync.yaml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Render every page but skip file writes, image downloads and status updates
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(args.config.as_deref()).context("invalid configuration")?;

    let notion = NotionClient::from_config(&cfg)?;
    let images = HttpImageFetcher::from_config(&cfg)?;

    info!(
        database_id = %cfg.notion.database_id,
        dry_run = args.dry_run,
        "Syncing content from Notion"
    );
    let summary = Syncer::new(&cfg, &notion, &images)
        .dry_run(args.dry_run)
        .run()
        .await?;

    info!(
        processed = summary.processed,
        failed = summary.failed,
        "Notion sync finished"
    );
    Ok(())
}

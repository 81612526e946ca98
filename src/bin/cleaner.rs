//! ScrollJar cleaner - removes stored content whose scroll no longer exists
//!
//! ```bash
//! scrolljar-cleaner [--dry-run] [--batch-size N]
//! ```

use anyhow::Context;
use clap::Parser;

use scrolljar::{Config, init_tracing};
use scrolljar_core::application::{CLEANUP_BATCH_SIZE, OrphanCleanupUseCase};
use scrolljar_core::infrastructure::{Persistence, storage};

/// Cleaner CLI arguments
#[derive(Parser, Debug)]
#[command(name = "scrolljar-cleaner", version)]
#[command(about = "Remove stored scroll content whose scroll no longer exists")]
struct Args {
    /// Report orphaned objects without deleting them
    #[arg(long)]
    dry_run: bool,

    /// Objects deleted per storage call
    #[arg(long, default_value_t = CLEANUP_BATCH_SIZE, value_parser = parse_batch_size)]
    batch_size: usize,
}

fn parse_batch_size(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("batch size must be at least 1".to_string()),
        Ok(size) => Ok(size),
        Err(e) => Err(e.to_string()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        eprintln!("Warning: Failed to load .env file: {}", e);
    }

    let args = Args::parse();
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config.logging)?;

    let persistence = Persistence::connect(&config.database)
        .await
        .map_err(|e| anyhow::anyhow!("failed to open the store: {}", e))?;
    let storage = storage::from_config(&config.storage, &config.server.base_url).await;

    tracing::info!(
        dry_run = args.dry_run,
        batch_size = args.batch_size,
        "Starting orphaned content cleanup"
    );

    let report = OrphanCleanupUseCase::new(persistence.scrolls, storage)
        .with_batch_size(args.batch_size)
        .execute(args.dry_run)
        .await
        .context("cleanup failed")?;

    tracing::info!(
        scanned = report.scanned,
        skipped = report.skipped,
        orphaned = report.orphaned,
        deleted = report.deleted,
        "Cleanup finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

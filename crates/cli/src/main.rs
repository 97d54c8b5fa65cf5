//! Coach CLI - one governed self-tuning run for a lane.
//!
//! Exits non-zero only when a required input cannot be read or an artifact
//! cannot be written. A rejected proposal is a normal outcome.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use coach_core::LaneId;
use coach_execution::TuningEngine;
use coach_storage::JsonStorage;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "coach")]
#[command(about = "Propose, shadow-test and judge a style change for one lane", long_about = None)]
struct Cli {
    /// Root directory holding canon/, adapters/, data/ and docs/
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Lane to tune
    #[arg(long, default_value = "lane1")]
    lane: LaneId,

    /// Seed for proposal and shadow randomness
    #[arg(long)]
    seed: Option<u64>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Skip the append-only receipt archive
    #[arg(long)]
    no_archive: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let storage = JsonStorage::new(&cli.root).await?.with_archive(!cli.no_archive);
    let mut engine = TuningEngine::new(storage, cli.lane);
    if let Some(seed) = cli.seed {
        info!("Using seed {}", seed);
        engine = engine.with_seed(seed);
    }

    let outcome = engine.run().await?;

    println!("Lane: {}", engine.lane());
    println!("  Verdict: {}", outcome.verdict);
    println!("  Status: {}", outcome.receipt.status);
    if !outcome.reasons.is_empty() {
        println!("  Reasons:");
        for reason in &outcome.reasons {
            println!("    - {}", reason);
        }
    }
    println!("  Digest: {}", outcome.receipt.digest());
    println!("  Receipt: {}", outcome.receipt_paths.lane.display());

    Ok(())
}

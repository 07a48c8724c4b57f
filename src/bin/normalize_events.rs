use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use eegprep::{normalize_batch, BatchConfig};

#[derive(Parser)]
#[command(name = "normalize_events", about = "Rewrite BIDS events tables with integer trial codes")]
struct Args {
    /// Batch config JSON; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the dataset root from the config.
    #[arg(long)]
    bids_root: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => BatchConfig::load(path)?,
        None => BatchConfig::default(),
    };
    if let Some(root) = args.bids_root {
        cfg.bids_root = root;
    }

    let summary = normalize_batch(&cfg)?;
    print!("{summary}");
    Ok(())
}

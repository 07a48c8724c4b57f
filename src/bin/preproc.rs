use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use eegprep::{clean_batch, BatchConfig, SpectralClassifier};

#[derive(Parser)]
#[command(name = "preproc", about = "Batch EEG cleaning: reference, filter, reject, ICA, export")]
struct Args {
    /// Batch config JSON; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the dataset root from the config.
    #[arg(long)]
    bids_root: Option<PathBuf>,

    /// Override the output root from the config.
    #[arg(long)]
    output_root: Option<PathBuf>,

    /// Process a single subject id (e.g. `07`) instead of the whole range.
    #[arg(long)]
    subject: Option<u32>,
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
    if let Some(root) = args.output_root {
        cfg.output_root = root;
    }
    if let Some(subject) = args.subject {
        cfg.subject_start = subject;
        cfg.subject_end = subject;
    }

    let summary = clean_batch(&cfg, &SpectralClassifier::default())?;
    print!("{summary}");
    Ok(())
}

//! Exercise Classification Pipeline - Main Entry Point

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use pipeline::{init_logging, load_table, run, PipelineConfig};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Classify barbell exercises from wearable sensor recordings")]
struct Args {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Recording to process (CSV or table snapshot)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Directory for results, report and selection artifact
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Maximum log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.json_logs)?;

    info!("=== Exercise Pipeline v{} ===", env!("CARGO_PKG_VERSION"));

    let mut config = PipelineConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(input) = args.input {
        config.data.input = Some(input);
    }
    if let Some(dir) = args.output_dir {
        config.output.dir = dir;
    }

    let input = config
        .data
        .input
        .clone()
        .ok_or_else(|| anyhow!("no input recording given (use --input or data.input)"))?;
    let table = load_table(&input).with_context(|| format!("failed to load {}", input.display()))?;

    let report = run(&table, &config).context("pipeline run failed")?;
    let written = report.write(&config.output)?;

    match &report.best {
        Some(best) => info!(
            "Best: {} on {} with accuracy {:.4}",
            best.model, best.feature_set, best.accuracy
        ),
        None => info!("No classifier produced a score"),
    }
    info!("Results in {}", written.results.display());
    Ok(())
}

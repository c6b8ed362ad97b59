//! Ocean SNR Run - batch driver for the signal-to-noise analysis
//!
//! # Usage
//!
//! ```bash
//! cargo run -p ocean-snr-run -- --config analysis.toml --output-dir out/
//! ```
//!
//! Log output is controlled with `RUST_LOG`; `-v` raises the default level
//! to `debug`.

use anyhow::Context;
use clap::Parser;
use ocean_snr_core::AnalysisConfig;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "ocean-snr-run")]
#[command(about = "Compare paleo and future ocean warming signal-to-noise ratios by region")]
struct Cli {
    /// Path to the TOML analysis configuration
    #[arg(short, long)]
    config: PathBuf,

    /// Override the output directory of the configuration
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn execute(cli: &Cli) -> anyhow::Result<()> {
    let mut config = AnalysisConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    info!(
        scenarios = config.inputs.scenarios.len(),
        periods = config.inputs.periods.len(),
        "Loaded configuration from {}",
        cli.config.display()
    );

    let summary = ocean_snr_core::run(&config).context("Analysis failed")?;

    info!(
        "Selected {} of the warming periods (threshold {:.4})",
        summary.selection.selected.len(),
        summary.selection.threshold
    );
    for record in summary.overlaps.iter().filter(|r| r.significant) {
        info!(
            region = %record.region.name,
            scenario = %record.scenario_b,
            p_adjusted = record.p_adjusted,
            "{}",
            record.marker
        );
    }
    for path in &summary.outputs {
        info!("Wrote {}", path.display());
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "ocean_snr_core={level},ocean_snr_run={level}",
                    level = default_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = execute(&cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

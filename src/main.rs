use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::{error, info};

use archive_cleaner::config::CleaningConfig;
use archive_cleaner::logging::{self, LoggingOptions};
use archive_cleaner::metrics;
use archive_cleaner::pipeline::{CleaningOutcome, CleaningPipeline};

#[derive(Parser)]
#[command(name = "archive_cleaner")]
#[command(about = "Unpack a JSON-lines archive and clean the resulting dataset")]
#[command(version)]
struct Cli {
    /// Directory for rotated JSON log files (console only when omitted)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full cleaning pipeline
    Clean {
        /// Archive to read; overrides the configured path
        #[arg(long)]
        archive: Option<PathBuf>,
        /// Config file; defaults to config/config_<STAGE>.toml
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write the clean dataset here as JSON lines
        #[arg(long)]
        output: Option<PathBuf>,
        /// Write the run report here as JSON
        #[arg(long)]
        report: Option<PathBuf>,
        /// Write a Prometheus text snapshot of the run's metrics here
        #[arg(long)]
        metrics_out: Option<PathBuf>,
    },
    /// Print the resolved configuration
    ShowConfig {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<CleaningConfig> {
    let config = match path {
        Some(p) => CleaningConfig::from_file(p)?
            .with_overrides(|key| std::env::var(key).ok()),
        None => CleaningConfig::load()?,
    };
    Ok(config)
}

fn print_summary(outcome: &CleaningOutcome) {
    let report = &outcome.report;
    println!("\n📊 Cleaning results for {}:", report.archive_path.display());
    println!(
        "   Entries: {} ({} skipped)",
        report.unpack.entries_total, report.unpack.entries_failed
    );
    println!("   Rows unpacked: {}", report.unpack.rows);
    println!("   Dropped for nulls: {}", report.nulls.rows_dropped);
    println!(
        "   Dropped by range on '{}': {} ({} negative, {} unreadable)",
        report.range.column,
        report.range.rows_dropped,
        report.range.negative_values,
        report.range.coercion_failures
    );
    println!("   Dropped as duplicates: {}", report.dedup.rows_dropped);
    println!("   Rows out: {}", report.rows_out);

    if !report.unpack.failures.is_empty() {
        println!("\n⚠️  Skipped entries:");
        for failure in &report.unpack.failures {
            println!("   - {}: {}", failure.entry, failure.reason);
        }
    }
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let _guard = logging::init_logging(&LoggingOptions {
        log_dir: cli.log_dir.clone(),
        ..Default::default()
    });

    match cli.command {
        Commands::Clean {
            archive,
            config,
            output,
            report,
            metrics_out,
        } => {
            let handle = metrics_out.as_ref().and_then(|_| metrics::install_prometheus_recorder());

            info!("Start cleaning meta data archive...");
            let config = load_config(config.as_ref())?;
            let mut pipeline = CleaningPipeline::new(&config)?;
            if let Some(path) = archive {
                pipeline = pipeline.with_archive_path(path);
            }

            let outcome = match pipeline.run() {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Cleaning failed: {}", e);
                    return Err(e.into());
                }
            };
            print_summary(&outcome);

            if let Some(path) = output {
                let file = File::create(&path)
                    .with_context(|| format!("Failed to create output '{}'", path.display()))?;
                outcome.dataset.write_json_lines(BufWriter::new(file))?;
                info!("Wrote {} rows to '{}'", outcome.dataset.len(), path.display());
            }
            if let Some(path) = report {
                fs::write(&path, serde_json::to_string_pretty(&outcome.report)?)
                    .with_context(|| format!("Failed to write report '{}'", path.display()))?;
            }
            if let (Some(path), Some(handle)) = (metrics_out, handle) {
                fs::write(&path, handle.render())
                    .with_context(|| format!("Failed to write metrics '{}'", path.display()))?;
            }
            info!("End cleaning meta data archive. Success!");
        }
        Commands::ShowConfig { config } => {
            let config = load_config(config.as_ref())?;
            let pipeline = CleaningPipeline::new(&config)?;
            println!("{}", serde_json::to_string_pretty(pipeline.config())?);
        }
    }
    Ok(())
}

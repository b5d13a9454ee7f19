use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use eventdepot::{InspectReport, PauseOutcome, RuntimeConfig};

/// Batch, persist, and deliver telemetry events to a data collector
#[derive(Parser)]
#[command(name = "eventdepot")]
#[command(version)]
#[command(about = "Batch, persist, and deliver telemetry events to a data collector", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Directory for persisted depot records (overrides config file)
    #[arg(short, long, value_name = "DIR", global = true)]
    storage: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Deliver newline-delimited JSON events, persisting what could not be sent
    Send {
        /// NDJSON input file (defaults to stdin)
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Seconds to wait for delivery before pausing the depot
        #[arg(short, long, value_name = "SECS", default_value_t = 30)]
        wait_secs: u64,
    },
    /// Print a summary of the persisted depot state without consuming it
    Inspect,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = if let Some(config_path) = &cli.config {
        RuntimeConfig::load_from_path(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        RuntimeConfig::load_or_default().context("Failed to load configuration")?
    };
    apply_cli_overrides(&mut config, &cli);
    config.validate()?;

    eventdepot::init_tracing(&config.logging);

    match cli.command {
        Commands::Send { input, wait_secs } => {
            let reader = eventdepot::open_input(input.as_deref())?;
            let report = eventdepot::run_send(&config, reader, Duration::from_secs(wait_secs))?;
            println!(
                "stored {} event(s), skipped {} line(s)",
                report.stored, report.skipped
            );
            if report.drained {
                println!("all events delivered");
            } else {
                println!("undelivered events kept in {}", config.storage.path);
            }
            if report.pause == PauseOutcome::TimedOut {
                eprintln!("warning: depot did not finish persisting before the drain timeout");
            }
            Ok(())
        }
        Commands::Inspect => {
            let report = eventdepot::run_inspect(&config)?;
            print_inspect(&report);
            Ok(())
        }
    }
}

fn apply_cli_overrides(config: &mut RuntimeConfig, cli: &Cli) {
    if let Some(storage) = &cli.storage {
        config.storage.path = storage.to_string_lossy().to_string();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
}

fn print_inspect(report: &InspectReport) {
    let Some(state) = &report.state else {
        println!("no persisted depot state");
        println!("archive records: {}", report.archive_records);
        return;
    };

    println!("destination: {}", state.holding_bin.destination);
    println!("holding events: {}", state.holding_bin.len());
    println!(
        "resend events: {} ({})",
        state.resend_bin.len(),
        state.resend_bin.destination
    );
    println!(
        "archive: start={} end={} bins={}",
        state.archive_start, state.archive_end, report.archived_bins
    );
    println!("archive records: {}", report.archive_records);
}

//! flcleaner - Replace double quotes with spaces in fixed-length files
//!
//! Main entry point for the command line application.
//!
//! # Overview
//!
//! The binary wires the library together the same way a graphical front end would:
//! - Logging infrastructure (daily file rotation + optional console output)
//! - Tokio runtime (jobs run on its blocking pool)
//! - State management ([`StateManager`]) with a listener that prints progress
//! - Configuration loading ([`ConfigManager`])
//! - [`CleaningController`] for selection and job execution
//!
//! # Execution Flow
//!
//! 1. Load `Cleaner Settings.yaml` from the config directory (defaults if missing)
//! 2. Initialize logging into the configured log directory, then write the
//!    default settings file if there was none
//! 3. Select the input, optionally override the output path
//! 4. Run the job and print the summary
//! 5. Log metrics and shut the runtime down
//!
//! The process exits with a non-zero status if the job fails.

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use flcleaner::metrics::Metrics;
use flcleaner::{
    APP_NAME, CleaningController, ConfigManager, StateChange, StateManager, VERSION,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

#[derive(Parser, Debug)]
#[command(name = "flcleaner", version, about = "Replace double quotes with spaces in text files and zip archives")]
struct Cli {
    /// Text file or .zip archive to clean
    input: Utf8PathBuf,

    /// Where to write the cleaned copy (defaults to <name>_cleaned.<ext> next to the input)
    #[arg(short, long)]
    output: Option<Utf8PathBuf>,

    /// Directory holding "Cleaner Settings.yaml"
    #[arg(long, default_value = ".")]
    config_dir: Utf8PathBuf,

    /// Enable debug logging regardless of the settings file
    #[arg(long)]
    debug: bool,

    /// Do not mirror log output to stderr
    #[arg(long)]
    no_console: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::new(&cli.config_dir)?;
    let config = config_manager.load_config()?;
    let settings = config.cleaner_settings;

    let log_dir = cli.config_dir.join(&settings.log_directory);
    let _log_guard = flcleaner::logging::setup_logging(
        &log_dir,
        APP_NAME,
        cli.debug || settings.debug_mode,
        !cli.no_console,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    // Leave an editable settings file behind; a read-only config dir is not fatal
    if let Err(e) = config_manager.ensure_settings_file() {
        tracing::warn!("Could not write default settings: {:#}", e);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("flcleaner-worker")
        .build()
        .context("Failed to build tokio runtime")?;

    let state_manager = Arc::new(StateManager::new());
    let metrics = Arc::new(Metrics::new());
    let controller = CleaningController::from_settings(
        state_manager.clone(),
        &settings,
        metrics.clone(),
        runtime.handle().clone(),
    );

    // Listener must subscribe before the job starts so no event is missed
    let listener = runtime.spawn(print_progress(state_manager.subscribe()));

    let result = runtime.block_on(async {
        controller.select_input(cli.input.as_str())?;
        if let Some(output) = cli.output.clone() {
            controller.set_output_path(output)?;
        }
        controller.clean().await
    });

    listener.abort();
    metrics.log_summary();
    runtime.shutdown_timeout(Duration::from_secs(5));

    match result {
        Ok(report) => {
            println!("{}: {}", report.output_path, report.summary());
            for failure in &report.failed_entries {
                println!("  failed: {} ({})", failure.entry, failure.error);
            }
            tracing::info!("Application shutdown complete");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Cleaning failed: {}", e);
            Err(anyhow::Error::new(e).context(format!("Could not clean {}", cli.input)))
        }
    }
}

/// Print archive entry progress as state events arrive
async fn print_progress(mut rx: tokio::sync::broadcast::Receiver<StateChange>) {
    loop {
        match rx.recv().await {
            Ok(StateChange::CleaningStarted { kind }) => {
                tracing::debug!("Cleaning {}", kind);
            }
            Ok(StateChange::EntryProgress {
                entry,
                current,
                total,
            }) => {
                eprintln!("[{}/{}] {}", current, total, entry);
            }
            Ok(StateChange::CleaningFinished { .. }) | Ok(StateChange::CleaningFailed { .. }) => {
                break;
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("Progress listener lagged, skipped {} events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

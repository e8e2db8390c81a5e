mod cli;
mod runtime;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use stenod_foundation::{AppState, ShutdownHandler, StateManager};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;

use crate::cli::Args;
use crate::runtime::{load_dictionaries, spawn_session_monitor, Driver, Machine, StdoutSink};

fn init_logging() -> anyhow::Result<()> {
    std::fs::create_dir_all("logs")?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "stenod.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr.and(non_blocking_file))
        .with_env_filter(log_level)
        .init();

    // Keep the appender guard alive for the life of the process.
    std::mem::forget(guard);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;
    let args = Args::parse();

    tracing::info!("Starting stenod");

    let state_manager = Arc::new(StateManager::new());
    let shutdown = ShutdownHandler::new().install().await;

    let dict = load_dictionaries(&args)?;
    let (source, mut machine) = Machine::open(&args)?;
    let monitor = machine
        .session_events()
        .map(|events| spawn_session_monitor(Arc::clone(&state_manager), events))
        .transpose()?;
    let driver = Driver::spawn(dict, StdoutSink::new(), source)?;
    let stats = Arc::clone(&driver.stats);

    // Teardown order: stopping the machine closes the chord queue,
    // which ends the driver's stream so it can drain and exit.
    shutdown.defer("machine", move || machine.stop());
    shutdown.defer("driver", move || driver.join());

    state_manager.transition(AppState::Running)?;

    let mut stats_interval = tokio::time::interval(Duration::from_secs(30));
    stats_interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.wait() => {
                tracing::info!("Shutdown signal received");
                break;
            }
            _ = stats_interval.tick() => {
                let snapshot = stats.snapshot();
                tracing::info!(
                    strokes = snapshot.strokes,
                    matches = snapshot.matches,
                    untranslated = snapshot.untranslated,
                    undos = snapshot.undos,
                    "engine stats"
                );
            }
        }
    }

    state_manager.transition(AppState::Stopping)?;
    shutdown.run_teardown();
    if let Some(monitor) = monitor {
        let _ = monitor.join();
    }
    state_manager.transition(AppState::Stopped)?;
    tracing::info!("Shutdown complete");
    Ok(())
}

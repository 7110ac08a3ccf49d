// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Text World Daemon (twd)
//!
//! Background process that owns a world's zones and its data directory.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::{interval_at, Instant, Interval};
use tracing::{error, info};

use tw_daemon::{init, startup, Config, LifecycleError};

#[derive(Parser)]
#[command(name = "twd", version, about = "Text world state daemon")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a world and serve it until SIGTERM/SIGINT
    Run(RunArgs),
    /// Create a data directory holding a one-room world
    Init(InitArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Path to the daemon config file
    #[arg(long, short)]
    config: PathBuf,
}

#[derive(Args)]
struct InitArgs {
    /// Directory for the event log, snapshots and intent log
    #[arg(long)]
    data_dir: PathBuf,

    /// Where to write the config file [default: <DATA_DIR>/twd.toml]
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Init(args) => {
            let (config, path) = init(&args.data_dir, args.config.as_deref()).await?;
            println!("Initialized world in {}", config.data_dir.display());
            println!("Front door: {}", config.world.front_door.location);
            println!("Config written to {}", path.display());
            Ok(())
        }
    }
}

async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(&args.config)?;

    // Write startup marker to log (before tracing setup, so operators can find it)
    write_startup_marker(&config)?;

    // Set up logging
    let log_guard = setup_logging(&config)?;

    info!("Starting twd with config: {}", args.config.display());

    let daemon = match startup(&config).await {
        Ok(d) => d,
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may not flush in time)
            write_startup_error(&config, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut snapshots = config.snapshot_interval.map(snapshot_timer);

    info!("Daemon ready, data dir {}", config.data_dir.display());

    // Signal ready for parent process (e.g., systemd)
    println!("READY");

    loop {
        tokio::select! {
            _ = next_snapshot(&mut snapshots) => {
                if let Err(e) = daemon.snapshot().await {
                    error!("Periodic snapshot failed: {}", e);
                }
            }

            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                break;
            }

            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down...");
                break;
            }
        }
    }

    daemon.shutdown().await?;
    info!("Daemon stopped");
    Ok(())
}

fn snapshot_timer(period: Duration) -> Interval {
    interval_at(Instant::now() + period, period)
}

/// Resolves on the next snapshot tick, or never when snapshots are off
async fn next_snapshot(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- twd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- twd: starting (pid: ";

/// Write startup marker to log file (appends to existing log)
fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    let log_path = config.log_path();
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.log_path())
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_path = config.log_path();
    let dir = log_path
        .parent()
        .ok_or_else(|| LifecycleError::NoLogDir(log_path.clone()))?;
    let file_name = log_path
        .file_name()
        .ok_or_else(|| LifecycleError::NoLogDir(log_path.clone()))?;
    std::fs::create_dir_all(dir)?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Set up subscriber with env filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

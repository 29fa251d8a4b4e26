// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! loamd, the Loam MUD driver process.
//!
//! Boots the world from `loam.toml`, listens for players, and runs the
//! engine loop until a signal or an in-game `shutdown`.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use loam_core::{Event, MudConfig};
use loam_daemon::{env, Driver};
use std::path::PathBuf;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config_arg: Option<PathBuf> = None;
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("loamd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("loamd {}", env!("CARGO_PKG_VERSION"));
                println!("Loam MUD driver - hosts the world and its players");
                println!();
                println!("USAGE:");
                println!("    loamd [CONFIG]");
                println!();
                println!("CONFIG defaults to ./loam.toml (or $LOAM_CONFIG).");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            path => config_arg = Some(PathBuf::from(path)),
        }
    }

    // Resolve configuration: explicit arg > env override > ./loam.toml
    let config_path = config_arg
        .or_else(env::config_path)
        .unwrap_or_else(|| PathBuf::from("loam.toml"));
    let (config, config_warnings) = if config_path.exists() {
        MudConfig::load(&config_path)?
    } else {
        eprintln!(
            "warning: no config at {}, using defaults",
            config_path.display()
        );
        let mut config = MudConfig::default();
        let warnings = config.normalize();
        (config, warnings)
    };

    // One driver per data tree; the lock outlives the run.
    let _lock = acquire_data_lock(&config)?;

    rotate_log_if_needed(&config.log.file);
    let _log_guard = setup_logging(&config)?;
    for warning in config_warnings {
        warn!("config: {warning}");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.port,
        mudlib = %config.mudlib_path.display(),
        "starting loamd"
    );

    let mut driver = Driver::new(config);
    if let Err(e) = driver.start().await {
        error!("failed to start driver: {e}");
        return Err(e.into());
    }

    spawn_signal_handlers(driver.sender());

    // READY marker for wrappers waiting on startup
    println!("READY {}", driver.local_addr().map(|a| a.to_string()).unwrap_or_default());

    driver.run().await?;
    info!("loamd stopped");
    Ok(())
}

/// Forward SIGTERM / SIGINT into the engine loop as shutdown events.
fn spawn_signal_handlers(tx: tokio::sync::mpsc::UnboundedSender<Event>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            let tx = tx.clone();
            tokio::spawn(async move {
                sigterm.recv().await;
                info!("SIGTERM received");
                let _ = tx.send(Event::Shutdown);
            });
        }
    }
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received");
            let _ = tx.send(Event::Shutdown);
        }
    });
}

/// Take an exclusive lock on the data tree so two drivers never share
/// one persistence root. Uses OpenOptions to avoid truncating the file
/// before the lock is held, which would wipe the running driver's PID.
fn acquire_data_lock(config: &MudConfig) -> Result<std::fs::File, Box<dyn std::error::Error>> {
    use fs2::FileExt;
    use std::io::Write;

    std::fs::create_dir_all(&config.data_path)?;
    let lock_path = config.data_path.join("loamd.pid");
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)?;
    if file.try_lock_exclusive().is_err() {
        let pid = std::fs::read_to_string(&lock_path).unwrap_or_default();
        eprintln!("loamd is already running on this data directory");
        if !pid.trim().is_empty() {
            eprintln!("  pid: {}", pid.trim());
        }
        std::process::exit(1);
    }
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(file)
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (loamd.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `loamd.log` → `loamd.log.1` → `loamd.log.2` → `loamd.log.3`,
/// deleting the oldest. Best-effort: rotation failures are silently
/// ignored so the driver still starts.
fn rotate_log_if_needed(log_file: &str) {
    if log_file.is_empty() {
        return;
    }
    let size = match std::fs::metadata(log_file) {
        Ok(meta) => meta.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_file}.{i}");
        let to = format!("{log_file}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_file, format!("{log_file}.1"));
}

fn setup_logging(
    config: &MudConfig,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log.level.clone()));

    let registry = tracing_subscriber::registry().with(filter);

    if config.log.file.is_empty() {
        if config.log.pretty {
            registry.with(fmt::layer().pretty()).init();
        } else {
            registry.with(fmt::layer().compact()).init();
        }
        return Ok(None);
    }

    let path = PathBuf::from(&config.log.file);
    let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
    std::fs::create_dir_all(dir)?;
    let file_name = path
        .file_name()
        .ok_or("log.file must name a file")?
        .to_os_string();
    let appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    if config.log.pretty {
        registry
            .with(fmt::layer().pretty())
            .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
            .init();
    } else {
        registry
            .with(fmt::layer().compact())
            .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
            .init();
    }
    Ok(Some(guard))
}

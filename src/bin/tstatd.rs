//! Thermostat daemon - control loops and monitor server
//!
//! This binary runs the cooling and alarm control loops and accepts
//! operator monitor sessions over TCP.
//!
//! # Usage
//!
//! ```bash
//! # Start the daemon (foreground)
//! tstatd start
//!
//! # Start with a 5 second cooler interval, in the background
//! tstatd start 5 -d
//!
//! # Stop the daemon
//! tstatd stop
//!
//! # Check daemon status
//! tstatd status
//! ```

use std::env;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tstat_core::{ParameterStore, TemperatureSensor};
use tstatd::config::{DaemonConfig, ADDR_ENV_VAR, DEFAULT_LISTEN_ADDR};
use tstatd::control::{
    spawn_alarm_task, spawn_cooler_task, AlarmContext, CoolerContext, SharedTemperature,
};
use tstatd::device::{DeviceError, FileSensor, LoggingIndicator, SimulatedAdc};
use tstatd::pool::SessionPool;
use tstatd::reaper::spawn_reaper_task;
use tstatd::server::MonitorServer;

/// Thermostat daemon - hysteretic cooling control with a TCP monitor port
#[derive(Parser, Debug)]
#[command(name = "tstatd", version, about)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the daemon
    Start {
        /// Cooler sampling interval in seconds (overrides the config file)
        interval: Option<u64>,

        /// Run as a background daemon (fork to background)
        #[arg(short = 'd', long)]
        daemon: bool,

        /// Config file path (default: ~/.config/tstat/config.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Stop the running daemon
    Stop,
    /// Show daemon status
    Status,
}

/// Directory holding the PID and log files.
fn state_dir() -> PathBuf {
    dirs::state_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("tstat")
}

fn pid_file_path() -> PathBuf {
    state_dir().join("tstatd.pid")
}

fn log_file_path() -> PathBuf {
    state_dir().join("tstatd.log")
}

fn read_pid() -> Option<u32> {
    let contents = fs::read_to_string(pid_file_path()).ok()?;
    contents.trim().parse().ok()
}

fn write_pid() -> Result<()> {
    let path = pid_file_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create state directory")?;
    }
    fs::write(&path, format!("{}\n", process::id())).context("Failed to write PID file")
}

fn remove_pid_file() {
    let _ = fs::remove_file(pid_file_path());
}

fn is_process_running(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

fn is_daemon_running() -> Option<u32> {
    let pid = read_pid()?;
    if is_process_running(pid) {
        return Some(pid);
    }
    // Stale PID file from an unclean shutdown.
    remove_pid_file();
    None
}

fn send_sigterm(pid: u32) -> Result<()> {
    #[cfg(unix)]
    {
        if unsafe { libc::kill(pid as i32, libc::SIGTERM) } != 0 {
            bail!("Failed to signal PID {pid} with SIGTERM");
        }
    }
    #[cfg(not(unix))]
    {
        bail!("Cannot stop PID {pid}: only supported on Unix");
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let command = args.command.unwrap_or(Command::Start {
        interval: None,
        daemon: false,
        config: None,
    });

    match command {
        Command::Start {
            interval,
            daemon,
            config,
        } => {
            if let Some(pid) = is_daemon_running() {
                eprintln!("tstatd is already running (PID {pid})");
                eprintln!("Use 'tstatd stop' to stop it first.");
                process::exit(1);
            }

            if daemon {
                daemonize()?;
            }

            write_pid()?;

            let result = run_daemon(config, interval);

            remove_pid_file();

            result
        }
        Command::Stop => {
            let Some(pid) = is_daemon_running() else {
                println!("tstatd is not running.");
                return Ok(());
            };

            println!("Stopping tstatd (PID {pid})...");
            send_sigterm(pid)?;

            for _ in 0..50 {
                std::thread::sleep(Duration::from_millis(100));
                if !is_process_running(pid) {
                    println!("Stopped.");
                    return Ok(());
                }
            }

            eprintln!("tstatd did not stop within 5 seconds.");
            process::exit(1);
        }
        Command::Status => {
            let Some(pid) = is_daemon_running() else {
                println!("tstatd is not running.");
                process::exit(1);
            };

            let addr =
                env::var(ADDR_ENV_VAR).unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string());
            println!("tstatd is running (PID {pid})");
            println!("Monitor port: {addr}");
            Ok(())
        }
    }
}

fn daemonize() -> Result<()> {
    use daemonize::Daemonize;

    let log_path = log_file_path();
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).context("Failed to create log directory")?;
    }

    // stdout and stderr share one log file handle.
    let log = File::create(&log_path)
        .with_context(|| format!("Failed to create log file {}", log_path.display()))?;
    let err_log = log.try_clone().context("Failed to clone log handle")?;

    Daemonize::new()
        .working_directory("/")
        .stdout(log)
        .stderr(err_log)
        .start()
        .context("Failed to daemonize")?;

    Ok(())
}

type DynSensor = Box<dyn TemperatureSensor + Send>;

/// Builds the cooler and alarm sensors from the config.
///
/// Both loops read the same source: file sensors share a path, simulated
/// sensors share the walk.
fn build_sensors(config: &DaemonConfig) -> Result<(DynSensor, DynSensor), DeviceError> {
    match &config.sensor_path {
        Some(path) => {
            let sensor = FileSensor::new(path)?;
            info!(path = %sensor.path().display(), "Using file sensor");
            Ok((Box::new(sensor.clone()), Box::new(sensor)))
        }
        None => {
            let adc = SimulatedAdc::new(config.sim_start_temperature);
            info!(
                start = config.sim_start_temperature,
                "Using simulated sensor"
            );
            Ok((Box::new(adc.clone()), Box::new(adc)))
        }
    }
}

#[tokio::main]
async fn run_daemon(config_path: Option<PathBuf>, interval: Option<u64>) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("tstatd=info".parse()?)
                .add_directive("tstat_core=info".parse()?)
                .add_directive("tstat_protocol=info".parse()?),
        )
        .init();

    let mut config = DaemonConfig::load(config_path.as_deref())
        .context("Failed to load configuration")?
        .apply_env();

    if let Some(secs) = interval {
        config.cooler_interval_secs = secs;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        addr = %config.listen_addr,
        parameters = %config.parameters,
        "Thermostat daemon starting"
    );

    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Shutdown signal listener failed");
        }
        shutdown_token.cancel();
    });

    // A dead sensor means there is nothing to control.
    let (cooler_sensor, alarm_sensor) = match build_sensors(&config) {
        Ok(sensors) => sensors,
        Err(e) => {
            error!(error = %e, "Sensor initialization failed");
            eprintln!("{e}");
            process::exit(2);
        }
    };

    let store = Arc::new(ParameterStore::new(config.parameters));
    let temperature = SharedTemperature::default();
    let pool = Arc::new(SessionPool::new());
    let (limit_tx, limit_rx) = watch::channel(config.parameters.limit);

    let cooler = CoolerContext::new(
        cooler_sensor,
        LoggingIndicator::new("cooler"),
        Arc::clone(&store),
        Arc::clone(&temperature),
        limit_tx,
    );
    let _cooler_handle = spawn_cooler_task(cooler, config.cooler_interval(), cancel_token.clone());

    let alarm = AlarmContext::new(alarm_sensor, LoggingIndicator::new("alarm"), limit_rx);
    let _alarm_handle = spawn_alarm_task(alarm, config.alarm_interval(), cancel_token.clone());

    let _reaper_handle = spawn_reaper_task(
        Arc::clone(&pool),
        config.reaper_interval(),
        cancel_token.clone(),
    );

    let server = MonitorServer::bind(config.listen_addr, store, temperature, pool, cancel_token)
        .await
        .context("Failed to bind monitor port")?;

    server.run().await;

    info!("Thermostat daemon stopped");
    Ok(())
}

async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        let received = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        info!(signal = received, "Received shutdown signal");
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}

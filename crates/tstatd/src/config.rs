//! Daemon configuration.
//!
//! Every field has a built-in default, so the daemon runs with no config
//! file at all. The TOML file lives at `~/.config/tstat/config.toml`
//! unless `--config` points elsewhere; the `TSTAT_ADDR` environment
//! variable overrides the listen address, and `tstatd start <interval>`
//! overrides the cooler interval for that run.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;
use tstat_core::Parameters;

/// Default TCP listen address for the monitor server.
pub const DEFAULT_LISTEN_ADDR: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8782);

/// Default cooler sampling interval in seconds.
pub const DEFAULT_COOLER_INTERVAL_SECS: u64 = 2;

/// Default alarm sampling interval in seconds.
pub const DEFAULT_ALARM_INTERVAL_SECS: u64 = 1;

/// Default reaper polling interval in seconds.
pub const DEFAULT_REAPER_INTERVAL_SECS: u64 = 5;

/// Default starting value for the simulated sensor.
pub const DEFAULT_SIM_START_TEMPERATURE: i64 = 72;

/// Environment variable overriding the listen address.
pub const ADDR_ENV_VAR: &str = "TSTAT_ADDR";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {error}")]
    Read { path: PathBuf, error: String },

    #[error("Failed to parse config file {path}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Daemon configuration as read from disk.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    /// TCP address the monitor server binds.
    pub listen_addr: SocketAddr,

    /// Cooler loop tick interval in seconds.
    pub cooler_interval_secs: u64,

    /// Alarm loop tick interval in seconds.
    pub alarm_interval_secs: u64,

    /// Reaper polling interval in seconds.
    pub reaper_interval_secs: u64,

    /// Initial control parameters (`[parameters]` table).
    pub parameters: Parameters,

    /// Sensor backend. `None` runs the simulated ADC; a path reads an
    /// integer from that file each sample, which covers sysfs thermal
    /// zones. Values are compared in the sensor's native scale.
    pub sensor_path: Option<PathBuf>,

    /// Starting value for the simulated sensor walk.
    pub sim_start_temperature: i64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR,
            cooler_interval_secs: DEFAULT_COOLER_INTERVAL_SECS,
            alarm_interval_secs: DEFAULT_ALARM_INTERVAL_SECS,
            reaper_interval_secs: DEFAULT_REAPER_INTERVAL_SECS,
            parameters: Parameters::default(),
            sensor_path: None,
            sim_start_temperature: DEFAULT_SIM_START_TEMPERATURE,
        }
    }
}

impl DaemonConfig {
    /// Default config file location: `~/.config/tstat/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tstat").join("config.toml"))
    }

    /// Loads configuration.
    ///
    /// An explicit path must exist and parse. Without one, the default
    /// path is read when present; otherwise the built-in defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(explicit) => Self::from_file(explicit),
            None => match Self::default_path() {
                Some(default) if default.exists() => Self::from_file(&default),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Applies the `TSTAT_ADDR` environment override, if set.
    pub fn apply_env(mut self) -> Self {
        if let Ok(raw) = std::env::var(ADDR_ENV_VAR) {
            match raw.parse() {
                Ok(addr) => self.listen_addr = addr,
                Err(e) => warn!(
                    value = %raw,
                    error = %e,
                    "Ignoring unparseable {ADDR_ENV_VAR}"
                ),
            }
        }
        self
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        toml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    pub fn cooler_interval(&self) -> Duration {
        Duration::from_secs(self.cooler_interval_secs)
    }

    pub fn alarm_interval(&self) -> Duration {
        Duration::from_secs(self.alarm_interval_secs)
    }

    pub fn reaper_interval(&self) -> Duration {
        Duration::from_secs(self.reaper_interval_secs)
    }
}

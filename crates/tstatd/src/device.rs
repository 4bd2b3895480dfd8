//! Sensor and indicator backends.
//!
//! Two sensors ship with the daemon: a simulated ADC doing a bounded
//! random walk, and a file-backed sensor that re-reads an integer from a
//! path each sample, which covers sysfs thermal zones. Indicators log;
//! real hardware would slot in behind the same trait.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use rand::Rng;
use thiserror::Error;
use tracing::debug;

use tstat_core::{Indicator, TemperatureSensor};

/// Lowest value the simulated walk can reach.
pub const SIM_FLOOR: i64 = 0;

/// Highest value the simulated walk can reach.
pub const SIM_CEILING: i64 = 120;

/// Largest per-sample step of the simulated walk.
pub const SIM_MAX_STEP: i64 = 2;

/// Errors raised while setting up a device backend.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Failed to initialize sensor from {path}: {error}")]
    SensorInit { path: PathBuf, error: String },
}

// ============================================================================
// Simulated ADC
// ============================================================================

/// Temperature source backed by a random walk.
///
/// Clones share the walk, so the cooler and alarm loops sample the same
/// drifting value rather than two independent ones. Every sample nudges
/// the value by at most [`SIM_MAX_STEP`] and clamps it between
/// [`SIM_FLOOR`] and [`SIM_CEILING`].
#[derive(Debug, Clone)]
pub struct SimulatedAdc {
    value: Arc<AtomicI64>,
}

impl SimulatedAdc {
    /// Creates a walk starting at `start`, clamped into range.
    pub fn new(start: i64) -> Self {
        Self {
            value: Arc::new(AtomicI64::new(start.clamp(SIM_FLOOR, SIM_CEILING))),
        }
    }
}

impl TemperatureSensor for SimulatedAdc {
    fn sample(&mut self) -> Option<i64> {
        let step = rand::thread_rng().gen_range(-SIM_MAX_STEP..=SIM_MAX_STEP);
        let current = self.value.load(Ordering::Relaxed);
        let next = (current + step).clamp(SIM_FLOOR, SIM_CEILING);
        self.value.store(next, Ordering::Relaxed);
        Some(next)
    }
}

// ============================================================================
// File Sensor
// ============================================================================

/// Temperature source reading an integer from a file on every sample.
///
/// Construction reads the file once and fails unless it holds an integer,
/// which surfaces a mistyped path at startup. Later read failures degrade
/// to `None` and the control loops skip those ticks.
#[derive(Debug, Clone)]
pub struct FileSensor {
    path: PathBuf,
}

impl FileSensor {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, DeviceError> {
        let path = path.into();

        let raw = std::fs::read_to_string(&path).map_err(|e| DeviceError::SensorInit {
            path: path.clone(),
            error: e.to_string(),
        })?;

        if raw.trim().parse::<i64>().is_err() {
            return Err(DeviceError::SensorInit {
                path,
                error: "source does not contain an integer".to_string(),
            });
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TemperatureSensor for FileSensor {
    fn sample(&mut self) -> Option<i64> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => match raw.trim().parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    debug!(path = %self.path.display(), "Sensor source is not an integer");
                    None
                }
            },
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "Sensor read failed");
                None
            }
        }
    }
}

// ============================================================================
// Indicators
// ============================================================================

/// Indicator that records drive calls in the log and nothing else.
#[derive(Debug, Clone)]
pub struct LoggingIndicator {
    label: &'static str,
}

impl LoggingIndicator {
    pub fn new(label: &'static str) -> Self {
        Self { label }
    }
}

impl Indicator for LoggingIndicator {
    fn set(&mut self, on: bool) {
        debug!(indicator = self.label, on, "Indicator driven");
    }
}

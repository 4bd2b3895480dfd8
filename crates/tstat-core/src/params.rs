//! Tunable control parameters and the lock-guarded store shared by every
//! consumer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

// ============================================================================
// Parameter Set
// ============================================================================

/// The three operator-tunable thermostat parameters.
///
/// No cross-field ordering is enforced: operators may place the limit below
/// the setpoint or set a negative deadband, and every consumer takes the
/// values at face value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Target temperature above which cooling engages.
    pub setpoint: i64,

    /// Temperature threshold above which the alarm engages.
    pub limit: i64,

    /// Hysteresis margin around the setpoint.
    pub deadband: i64,
}

impl Parameters {
    /// Factory default setpoint.
    pub const DEFAULT_SETPOINT: i64 = 65;

    /// Factory default alarm limit.
    pub const DEFAULT_LIMIT: i64 = 95;

    /// Factory default hysteresis margin.
    pub const DEFAULT_DEADBAND: i64 = 1;

    /// Creates a parameter set from explicit values.
    pub fn new(setpoint: i64, limit: i64, deadband: i64) -> Self {
        Self {
            setpoint,
            limit,
            deadband,
        }
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_SETPOINT,
            Self::DEFAULT_LIMIT,
            Self::DEFAULT_DEADBAND,
        )
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "setpoint={} limit={} deadband={}",
            self.setpoint, self.limit, self.deadband
        )
    }
}

/// Selects one field of [`Parameters`] for a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameter {
    Setpoint,
    Limit,
    Deadband,
}

impl Parameter {
    /// Lower-case field name, used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Setpoint => "setpoint",
            Self::Limit => "limit",
            Self::Deadband => "deadband",
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Parameter Store
// ============================================================================

/// Shared storage for the live control parameters.
///
/// One mutex serializes every reader and writer; hold time is a single
/// field copy. Readers receive a snapshot and never observe a half-written
/// field, though successive per-field writes may interleave between two
/// snapshots.
#[derive(Debug, Default)]
pub struct ParameterStore {
    inner: Mutex<Parameters>,
}

impl ParameterStore {
    /// Creates a store seeded with the given parameters.
    pub fn new(initial: Parameters) -> Self {
        Self {
            inner: Mutex::new(initial),
        }
    }

    /// Returns a snapshot copy of all three parameters.
    pub fn get(&self) -> Parameters {
        *self.lock()
    }

    pub fn set_setpoint(&self, value: i64) {
        self.lock().setpoint = value;
    }

    pub fn set_limit(&self, value: i64) {
        self.lock().limit = value;
    }

    pub fn set_deadband(&self, value: i64) {
        self.lock().deadband = value;
    }

    /// Writes the field selected by `parameter`.
    pub fn set(&self, parameter: Parameter, value: i64) {
        match parameter {
            Parameter::Setpoint => self.set_setpoint(value),
            Parameter::Limit => self.set_limit(value),
            Parameter::Deadband => self.set_deadband(value),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Parameters> {
        // A panicked writer cannot tear three plain integers; absorb the
        // poison instead of propagating a panic into the control loop.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

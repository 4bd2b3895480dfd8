//! Core domain types for the tstat thermostat service.
//!
//! This crate holds the pieces shared between the daemon (`tstatd`) and the
//! wire protocol crate: the tunable parameter set with its lock-guarded
//! store and the two hysteretic control state machines. The hardware
//! capability traits the control loops are written against live here too.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod control;
pub mod device;
pub mod params;

// Re-exports for convenience
pub use control::{Action, AlarmStateMachine, ControlState, CoolerStateMachine};
pub use device::{Indicator, TemperatureSensor};
pub use params::{Parameter, ParameterStore, Parameters};

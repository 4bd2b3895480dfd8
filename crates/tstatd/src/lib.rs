//! tstatd - thermostat control daemon
//!
//! This crate provides the daemon's moving parts:
//! - `control` - the cooler and alarm loop contexts and their tasks
//! - `server` - TCP monitor server and per-connection sessions
//! - `pool` - the fixed-size session slot pool
//! - `reaper` - background reclamation of finished sessions
//! - `device` - sensor and indicator backends
//! - `config` - TOML configuration and defaults
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        tstatd daemon                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  ┌──────────────┐  limit (watch)   ┌──────────────┐          │
//! │  │ CoolerContext│─────────────────▶│ AlarmContext │          │
//! │  │  (tick loop) │                  │  (tick loop) │          │
//! │  └──────┬───────┘                  └──────────────┘          │
//! │         │ samples                                            │
//! │         ▼                                                    │
//! │  ┌──────────────┐   reads/writes   ┌──────────────┐          │
//! │  │ParameterStore│◀─────────────────│MonitorSession│ (per     │
//! │  └──────────────┘                  └──────▲───────┘  client) │
//! │                                           │ slots            │
//! │  ┌──────────────┐   Pending→Free   ┌──────┴───────┐          │
//! │  │SessionReaper │◀────────────────▶│ MonitorServer│          │
//! │  └──────────────┘                  └──────────────┘          │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Mutex poisoning is absorbed; the guarded data is plain bookkeeping

pub mod config;
pub mod control;
pub mod device;
pub mod pool;
pub mod reaper;
pub mod server;

//! Runtime glue that wires configuration, telemetry, and runner
//! orchestration.

pub mod config;
pub mod runner;
pub mod telemetry;

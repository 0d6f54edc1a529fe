//! Health engine error types.

use std::time::Duration;

use thiserror::Error;

pub type MonitorResult<T> = Result<T, MonitorError>;

/// Errors surfaced by the engine's setup calls. Probes never produce these.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("service {name}: check interval must be greater than zero (got {interval:?})")]
    InvalidInterval { name: String, interval: Duration },

    #[error("service name must not be empty")]
    EmptyName,

    #[error("failed to build HTTP transport: {0}")]
    Transport(String),
}

/// Errors from arming or disarming a periodic trigger.
///
/// The engine logs and swallows these; monitoring of other services goes on.
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("no async runtime available to drive the trigger")]
    NoRuntime,
}

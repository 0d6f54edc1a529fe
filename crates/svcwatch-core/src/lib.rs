pub mod config;
pub mod error;
pub mod types;

pub use config::{
    parse_duration, ApiConfig, ProbeConfig, ServiceSpec, SvcwatchConfig, DEFAULT_PROBE_TIMEOUT,
};
pub use error::{ConfigError, ConfigResult};
pub use types::*;

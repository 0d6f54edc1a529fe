//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for config loading and validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating `svcwatch.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no services configured")]
    NoServices,

    #[error("service at index {0} has an empty name")]
    EmptyName(usize),

    #[error("duplicate service name: {0}")]
    DuplicateService(String),

    #[error("service {0} has an empty endpoint")]
    EmptyEndpoint(String),

    #[error("invalid duration for {field}: {value:?}")]
    InvalidDuration { field: String, value: String },

    #[error("{0} must be greater than zero")]
    ZeroDuration(String),
}

//! Pool configuration
//!
//! [`PoolSettings`] holds the policy values a pool is launched with.
//! [`ConfigRegistry`] is the external configuration surface pools read
//! from; its mutators are reachable only from the pool whose settings they
//! change (in practice, from an executed proposal).

pub mod registry;
pub mod settings;

use thiserror::Error;

pub use registry::{ConfigRegistry, selectors};
pub use settings::{ExpiryPolicy, PoolSettings, ThresholdRule};

/// Errors that can occur in configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Failed to read file: {0}")]
    FileReadError(String),

    #[error("Failed to parse YAML: {0}")]
    YamlParseError(#[from] serde_yaml::Error),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

impl From<ConfigError> for coffer_common::Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::InvalidSetting(msg) => coffer_common::Error::Validation(msg),
            other => coffer_common::Error::Validation(other.to_string()),
        }
    }
}

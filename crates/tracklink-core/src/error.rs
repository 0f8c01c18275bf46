//! Shared error types.
//!
//! `ConfigError` covers settings files and value ranges; its `InvalidValue`
//! case is what job submission reports for out-of-range parameters.

use thiserror::Error;

/// Errors from the shared value types.
#[derive(Error, Debug)]
pub enum TracklinkError {
    /// Settings could not be loaded or validated
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    /// A value failed to parse (job id, platform name)
    #[error("invalid value: {0}")]
    Validation(String),
}

/// Settings errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No per-user config directory on this platform
    #[error("no config directory available for this user")]
    NoConfigDir,

    /// An explicitly requested config file does not exist
    #[error("no config file at {path}")]
    NotFound {
        /// Requested location
        path: String,
    },

    /// File is not valid TOML for `AppConfig`
    #[error("config is not valid TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Reading or writing the file failed
    #[error("config file I/O: {0}")]
    Io(#[from] std::io::Error),

    /// A setting is out of range
    #[error("{field} {reason}")]
    InvalidValue {
        /// Setting name
        field: String,
        /// What is wrong with it
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for shared operations.
pub type Result<T> = std::result::Result<T, TracklinkError>;

/// Result type for settings operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

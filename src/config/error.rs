//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Mode is not one of `train`, `index`, `query`.
    #[error("invalid mode '{value}': expected train, index or query")]
    InvalidMode { value: String },

    /// A numeric variable could not be parsed.
    #[error("failed to parse {name}='{value}': {source}")]
    InvalidNumber {
        name: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// A boolean variable is not `true`/`false`/`1`/`0`.
    #[error("failed to parse {name}='{value}': expected a boolean")]
    InvalidBool { name: &'static str, value: String },

    /// Send timeout must be positive.
    #[error("send timeout must be greater than zero")]
    ZeroTimeout,

    /// Address is not `host:port`.
    #[error("invalid address for {name}: '{value}'")]
    InvalidAddr { name: &'static str, value: String },

    /// Service name must not be blank.
    #[error("service name must not be empty")]
    EmptyServiceName,

    /// Specified path does not exist on the filesystem.
    #[error("path does not exist: {path}")]
    PathNotFound { path: PathBuf },

    /// Path exists but is not a file (when a file was expected).
    #[error("path is not a file: {path}")]
    NotAFile { path: PathBuf },

    /// Path exists but is not a directory (when a directory was expected).
    #[error("path is not a directory: {path}")]
    NotADirectory { path: PathBuf },
}

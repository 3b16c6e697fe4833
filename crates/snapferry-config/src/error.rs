//! Error types for configuration loading.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the configuration file failed.
    #[error("failed to read configuration file")]
    Read {
        /// Path that could not be read.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// The configuration file was not valid YAML for the expected schema.
    #[error("failed to parse configuration file")]
    Parse {
        /// Path of the offending document.
        path: PathBuf,
        /// Source YAML error.
        source: serde_yaml::Error,
    },
    /// Resolving the working directory failed.
    #[error("failed to resolve working directory")]
    CurrentDir {
        /// Source IO error.
        source: io::Error,
    },
    /// A required field was absent or empty.
    #[error("missing configuration field")]
    MissingField {
        /// Section containing the field.
        section: &'static str,
        /// Name of the field.
        field: &'static str,
    },
    /// A field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Section containing the field.
        section: &'static str,
        /// Name of the field.
        field: &'static str,
        /// Offending value when it is safe to echo.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

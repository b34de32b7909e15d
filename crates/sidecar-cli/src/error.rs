//! CLI-specific error types and mappings.
//!
//! Maps core errors to exit codes and user-facing messages.

use sidecar_core::{PathError, SettingsError};
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid setting name or value given on the command line.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (settings file unreadable, no home directory, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Settings failed validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The server could not be started or stopped running.
    #[error("{0}")]
    Process(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 0: Success
    /// - 1: Server failed to start or exited unexpectedly
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 64-78: Reserved for specific error categories (see sysexits.h)
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Process(_) => 1,
            Self::Arguments(_) => 2, // EX_USAGE
            Self::Io(_) => 74,       // EX_IOERR
            Self::Config(_) => 78,   // EX_CONFIG
        }
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::UnknownKey(_) | SettingsError::InvalidValue { .. } => {
                Self::Arguments(err.to_string())
            }
            _ => Self::Config(err.to_string()),
        }
    }
}

impl From<PathError> for CliError {
    fn from(err: PathError) -> Self {
        match err {
            PathError::MalformedSettings { .. } => Self::Config(err.to_string()),
            _ => Self::Io(err.to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

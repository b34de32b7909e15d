//! Path-related error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving directories or touching the
/// settings file.
#[derive(Debug, Error)]
pub enum PathError {
    /// Could not determine the user's home directory.
    #[error("Cannot determine home directory")]
    NoHomeDir,

    /// Could not determine the system configuration directory.
    #[error("Cannot determine system configuration directory")]
    NoConfigDir,

    /// Failed to create a directory.
    #[error("Failed to create directory {path}: {reason}")]
    CreateFailed { path: PathBuf, reason: String },

    /// Failed to read or write the settings file.
    #[error("Failed to access settings file {path}: {reason}")]
    SettingsFileError { path: PathBuf, reason: String },

    /// The settings file exists but is not valid JSON for [`crate::Settings`].
    #[error("Settings file {path} is malformed: {reason}")]
    MalformedSettings { path: PathBuf, reason: String },
}

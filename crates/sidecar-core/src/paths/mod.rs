//! Path utilities for sidecar configuration.
//!
//! - Configuration root and settings file location
//! - The user home directory, used as the spawn working directory
//!
//! Returns `PathBuf` and `PathError`; no interactive I/O happens here.

mod config;
mod error;

use std::env;
use std::path::PathBuf;

pub use config::{load_settings, load_settings_from, save_settings, save_settings_to};
pub use error::PathError;

/// Environment variable overriding the configuration root.
pub const CONFIG_DIR_ENV: &str = "SIDECAR_CONFIG_DIR";

/// File name of the persisted settings.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Get the root directory for configuration.
///
/// Resolution order:
/// 1. `SIDECAR_CONFIG_DIR` environment variable
/// 2. System configuration directory (e.g. `~/.config/sidecar`)
pub fn config_root() -> Result<PathBuf, PathError> {
    if let Ok(dir) = env::var(CONFIG_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    dirs::config_dir()
        .map(|dir| dir.join("sidecar"))
        .ok_or(PathError::NoConfigDir)
}

/// Location of the settings file.
pub fn settings_path() -> Result<PathBuf, PathError> {
    Ok(config_root()?.join(SETTINGS_FILE_NAME))
}

/// Directory the supervised server is spawned in.
///
/// The server keeps global state (sessions, auth) under the user's home, so it
/// is launched there rather than inside the project it serves.
pub fn home_dir() -> Result<PathBuf, PathError> {
    dirs::home_dir().ok_or(PathError::NoHomeDir)
}

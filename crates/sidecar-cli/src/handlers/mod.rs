//! Command handlers.
//!
//! Handlers follow one pattern:
//! - Signature: `pub async fn execute(config: Option<&Path>, ...) -> Result<(), CliError>`
//! - Resolve the settings file, call into the supervisor or the settings
//!   store, and format output for the terminal.

pub mod config;
pub mod probe;
pub mod run;

use std::path::{Path, PathBuf};

use sidecar_core::Settings;
use sidecar_core::paths::{
    load_settings, load_settings_from, save_settings, save_settings_to, settings_path,
};

use crate::error::CliError;

/// Settings file to use: the `--config` override, else the default location.
pub fn settings_file(config: Option<&Path>) -> Result<PathBuf, CliError> {
    match config {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(settings_path()?),
    }
}

/// Load settings from the `--config` file or the default location.
pub fn load(config: Option<&Path>) -> Result<Settings, CliError> {
    let settings = match config {
        Some(path) => load_settings_from(path)?,
        None => load_settings()?,
    };
    Ok(settings)
}

/// Persist settings to the `--config` file or the default location.
pub fn save(config: Option<&Path>, settings: &Settings) -> Result<(), CliError> {
    match config {
        Some(path) => save_settings_to(path, settings)?,
        None => save_settings(settings)?,
    }
    Ok(())
}

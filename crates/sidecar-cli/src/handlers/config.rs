//! Config command handler.
//!
//! Shows and edits the settings file. Every write is validated first so the
//! file never holds settings the supervisor would reject.

use std::path::Path;

use sidecar_core::{Settings, SettingsUpdate, validate_settings};

use super::{load, save, settings_file};
use crate::config_commands::ConfigCommand;
use crate::error::CliError;

/// Execute the config command.
pub fn execute(config: Option<&Path>, command: ConfigCommand) -> Result<(), CliError> {
    match command {
        ConfigCommand::Show => {
            let settings = load(config)?;
            let rendered = serde_json::to_string_pretty(&settings)
                .map_err(|e| CliError::Config(e.to_string()))?;
            println!("{rendered}");
        }
        ConfigCommand::Path => {
            println!("{}", settings_file(config)?.display());
        }
        ConfigCommand::Set { key, value } => {
            let settings = set(config, &key, &value)?;
            println!("✓ Updated {key}");
            println!("  Server URL: {}", settings.server_url());
        }
        ConfigCommand::Reset => {
            save(config, &Settings::with_defaults())?;
            println!("✓ Settings reset to defaults");
        }
    }

    Ok(())
}

/// Apply one `key = value` change to the settings file and return the saved
/// settings.
fn set(config: Option<&Path>, key: &str, value: &str) -> Result<Settings, CliError> {
    let update = SettingsUpdate::from_key_value(key, value)?;
    let mut settings = load(config)?;
    settings.merge(&update);
    validate_settings(&settings)?;
    save(config, &settings)?;
    Ok(settings)
}

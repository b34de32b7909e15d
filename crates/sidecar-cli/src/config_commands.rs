//! Configuration management subcommands.

use clap::Subcommand;

/// Settings file commands.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show all current settings
    Show,
    /// Print the location of the settings file
    Path,
    /// Change one setting (e.g. `set port 15000`, `set projectDirectory ~/notes`)
    Set {
        /// Setting name: serverPath, port, hostname, autoStart, startupTimeoutMs,
        /// projectDirectory or corsOrigin
        key: String,
        /// New value (an empty projectDirectory clears it)
        value: String,
    },
    /// Reset all settings to defaults
    Reset,
}

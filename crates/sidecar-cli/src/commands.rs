//! Main commands enum.

use clap::{Args, Subcommand};

use crate::config_commands::ConfigCommand;

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Start the server, keep it supervised until Ctrl-C, then shut it down
    Run(RunArgs),

    /// Report whether the configured server answers and whether its port is taken
    Probe,

    /// Inspect or edit the settings file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Per-invocation overrides for `run`. Nothing here is persisted.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Project directory served by the server
    #[arg(long)]
    pub project_dir: Option<String>,

    /// Port the server listens on (>= 1024)
    #[arg(long)]
    pub port: Option<u16>,

    /// Hostname the server binds to
    #[arg(long)]
    pub hostname: Option<String>,

    /// Path to the server executable
    #[arg(long)]
    pub server_path: Option<String>,

    /// Startup timeout in milliseconds (1000-600000)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Only start when `autoStart` is enabled in the settings (for login
    /// scripts and service units)
    #[arg(long)]
    pub if_auto_start: bool,
}

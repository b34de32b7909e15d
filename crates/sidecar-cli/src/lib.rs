//! Command-line host for the sidecar supervisor.
//!
//! `sidecar run` supervises the server in the foreground, `sidecar probe`
//! inspects the configured address and `sidecar config` edits the settings
//! file shared with every other host.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used by the binary for logging setup
use anyhow as _;
use tracing_subscriber as _;

pub mod commands;
pub mod config_commands;
pub mod error;
pub mod handlers;
pub mod parser;

// Re-export primary types for convenient access
pub use commands::{Commands, RunArgs};
pub use config_commands::ConfigCommand;
pub use error::CliError;
pub use parser::Cli;

//! CLI entry point.
//!
//! Sets up logging, parses arguments and dispatches to the handlers. Handler
//! errors are printed and mapped to the process exit code.

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use sidecar_cli::{Cli, CliError, Commands, handlers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let Some(command) = cli.command else {
        // No command provided - show help
        Cli::command().print_help()?;
        return Ok(());
    };

    if let Err(err) = dispatch(cli.config.as_deref(), command).await {
        eprintln!("Error: {err}");
        std::process::exit(err.exit_code());
    }
    Ok(())
}

async fn dispatch(config: Option<&std::path::Path>, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Run(args) => handlers::run::execute(config, args).await,
        Commands::Probe => handlers::probe::execute(config).await,
        Commands::Config { command } => handlers::config::execute(config, command),
    }
}

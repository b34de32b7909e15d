//! Run command handler.
//!
//! Starts the server under supervision and keeps it alive until Ctrl-C or
//! until it stops by itself.

use std::future::Future;
use std::io;
use std::path::Path;

use tokio::sync::watch;
use tracing::{error, info, warn};

use sidecar_core::{ProcessState, Settings, validate_settings};
use sidecar_runtime::ProcessSupervisor;

use super::load;
use crate::commands::RunArgs;
use crate::error::CliError;

/// Execute the run command.
pub async fn execute(config: Option<&Path>, args: RunArgs) -> Result<(), CliError> {
    let only_if_auto_start = args.if_auto_start;
    let mut settings = load(config)?;
    apply_overrides(&mut settings, args, &std::env::current_dir()?);
    validate_settings(&settings)?;

    if only_if_auto_start && !settings.auto_start {
        info!("autoStart is disabled, not starting the server");
        println!("autoStart is disabled; enable it with `sidecar config set autoStart true`");
        return Ok(());
    }

    let supervisor =
        ProcessSupervisor::local(settings).map_err(|e| CliError::Process(e.to_string()))?;
    supervise(&supervisor, tokio::signal::ctrl_c()).await
}

/// Start `supervisor` and keep it running until `interrupt` resolves or the
/// server stops by itself. The server is shut down on every exit path.
async fn supervise<F>(supervisor: &ProcessSupervisor, interrupt: F) -> Result<(), CliError>
where
    F: Future<Output = io::Result<()>>,
{
    tokio::pin!(interrupt);

    let (state_tx, mut state_rx) = watch::channel(supervisor.state());
    let _subscription = supervisor.on_state_change(move |state| {
        state_tx.send_replace(state);
    });

    println!("Starting server at {}...", supervisor.url());
    let started = tokio::select! {
        started = supervisor.start() => started,
        signal = &mut interrupt => {
            info!("Interrupted during startup, shutting down server");
            supervisor.shutdown().await;
            signal?;
            println!("✓ Startup cancelled");
            return Ok(());
        }
    };

    if !started {
        let reason = supervisor
            .last_error()
            .unwrap_or_else(|| "Start was interrupted".to_string());
        error!(%reason, "Server failed to start");
        supervisor.shutdown().await;
        return Err(CliError::Process(reason));
    }

    match supervisor.pid() {
        Some(pid) => println!("✓ Server running at {} (pid {pid})", supervisor.url()),
        None => println!("✓ Reusing server already running at {}", supervisor.url()),
    }
    println!("Press Ctrl-C to stop.");

    let outcome = tokio::select! {
        signal = &mut interrupt => {
            info!("Interrupted, shutting down server");
            signal.map_err(CliError::from)
        }
        _ = state_rx.wait_for(|state| *state == ProcessState::Stopped) => {
            warn!("Server stopped on its own");
            Err(CliError::Process("Server exited unexpectedly".to_string()))
        }
    };

    supervisor.shutdown().await;
    if outcome.is_ok() {
        println!("✓ Server stopped");
    }
    outcome
}

/// Layer command-line overrides over the loaded settings.
///
/// Without a configured project directory the server serves `cwd`.
fn apply_overrides(settings: &mut Settings, args: RunArgs, cwd: &Path) {
    if let Some(path) = args.server_path {
        settings.server_path = path;
    }
    if let Some(port) = args.port {
        settings.port = port;
    }
    if let Some(hostname) = args.hostname {
        settings.hostname = hostname;
    }
    if let Some(timeout) = args.timeout_ms {
        settings.startup_timeout_ms = timeout;
    }
    if let Some(dir) = args.project_dir {
        settings.project_directory = Some(dir);
    }
    if settings.project_directory.is_none() {
        settings.project_directory = Some(cwd.display().to_string());
    }
}

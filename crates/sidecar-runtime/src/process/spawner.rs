//! `tokio::process` implementation of [`ProcessSpawner`].

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use sidecar_core::ports::{
    ExitInfo, ProcessEvent, ProcessSpawner, SpawnError, SpawnRequest, SpawnedProcess,
};

use super::control::ChildControl;
use super::stream::{StreamKind, spawn_stream_reader};

/// How long the waiter lets the readers drain after the child exits.
///
/// A grandchild inheriting the pipes can keep them open indefinitely, so the
/// exit event must not wait on EOF forever.
const READER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Spawns children with `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessSpawner;

impl ProcessSpawner for TokioProcessSpawner {
    fn spawn(&self, request: &SpawnRequest) -> Result<SpawnedProcess, SpawnError> {
        let mut cmd = Command::new(&request.program);
        cmd.args(&request.args)
            .current_dir(&request.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| SpawnError::from_io(&request.program, &e))?;
        let pid = child.id();

        info!(
            ?pid,
            program = %request.program.display(),
            args = ?request.args,
            cwd = %request.working_dir.display(),
            "Spawned server process"
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_stream_reader(stdout, pid, StreamKind::Stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_stream_reader(stderr, pid, StreamKind::Stderr, tx.clone()));
        }

        let kill_requested = CancellationToken::new();
        let control = Arc::new(ChildControl::new(pid, kill_requested.clone()));
        tokio::spawn(wait_for_exit(
            child,
            Arc::clone(&control),
            readers,
            tx,
            kill_requested,
        ));

        Ok(SpawnedProcess {
            control,
            events: rx,
        })
    }
}

/// Own the child until it exits, then publish the exit after its output.
async fn wait_for_exit(
    mut child: Child,
    control: Arc<ChildControl>,
    readers: Vec<JoinHandle<()>>,
    events: UnboundedSender<ProcessEvent>,
    kill_requested: CancellationToken,
) {
    let pid = child.id();
    let status = tokio::select! {
        status = child.wait() => status,
        () = kill_requested.cancelled() => {
            warn!(?pid, "Killing server process");
            if let Err(e) = child.start_kill() {
                debug!(?pid, error = %e, "kill failed, process probably already exited");
            }
            child.wait().await
        }
    };

    let info = match status {
        Ok(status) => exit_info(status),
        Err(e) => {
            warn!(?pid, error = %e, "Failed to wait for server process");
            ExitInfo::default()
        }
    };

    let deadline = Instant::now() + READER_DRAIN_TIMEOUT;
    for reader in readers {
        if timeout_at(deadline, reader).await.is_err() {
            debug!(?pid, "Output stream still open after exit, not waiting for it");
        }
    }

    control.record_exit(info);
    let _ = events.send(ProcessEvent::Exited(info));
}

#[cfg(unix)]
fn exit_info(status: ExitStatus) -> ExitInfo {
    use std::os::unix::process::ExitStatusExt;

    ExitInfo {
        code: status.code(),
        signal: status.signal(),
    }
}

#[cfg(not(unix))]
fn exit_info(status: ExitStatus) -> ExitInfo {
    ExitInfo {
        code: status.code(),
        signal: None,
    }
}

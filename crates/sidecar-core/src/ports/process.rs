//! Process spawning port.
//!
//! A spawn yields two things: a [`ProcessControl`] handle bound to that one
//! process, and an ordered stream of [`ProcessEvent`]s ending with
//! [`ProcessEvent::Exited`].

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::settings::Settings;

/// What to launch and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    /// Executable path or bare name resolved through `PATH`.
    pub program: PathBuf,
    /// Argument vector, excluding the program itself.
    pub args: Vec<String>,
    /// Working directory of the child.
    pub working_dir: PathBuf,
}

impl SpawnRequest {
    /// Build the serve-mode invocation for `settings`:
    /// `serve --port <port> --hostname <hostname> --cors <origin>`.
    #[must_use]
    pub fn serve(settings: &Settings, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: PathBuf::from(&settings.server_path),
            args: vec![
                "serve".to_string(),
                "--port".to_string(),
                settings.port.to_string(),
                "--hostname".to_string(),
                settings.hostname.clone(),
                "--cors".to_string(),
                settings.cors_origin.clone(),
            ],
            working_dir: working_dir.into(),
        }
    }
}

/// How a process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExitInfo {
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Terminating signal, if the process was killed by one (Unix only).
    pub signal: Option<i32>,
}

impl ExitInfo {
    /// Exit code when it signals failure (nonzero).
    #[must_use]
    pub const fn failure_code(&self) -> Option<i32> {
        match self.code {
            Some(0) | None => None,
            Some(code) => Some(code),
        }
    }
}

/// Something observed on a spawned process, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// One line of standard output, without the trailing newline.
    Stdout(String),
    /// One line of the diagnostic stream, without the trailing newline.
    Stderr(String),
    /// The process exited. Always the last event; every captured output line
    /// is delivered before it.
    Exited(ExitInfo),
}

/// Failure to deliver a signal.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The OS refused the signal.
    #[error("Failed to signal process {pid:?}: {reason}")]
    SignalFailed { pid: Option<u32>, reason: String },
}

/// Handle to one specific spawned process.
///
/// Once the exit has been observed, `terminate` and `kill` become no-ops so a
/// recycled PID is never signalled.
pub trait ProcessControl: Send + Sync {
    /// OS process id, when known.
    fn pid(&self) -> Option<u32>;

    /// Ask the process to exit (SIGTERM on Unix).
    fn terminate(&self) -> Result<(), ProcessError>;

    /// Kill the process unconditionally (SIGKILL on Unix).
    fn kill(&self) -> Result<(), ProcessError>;

    /// How the process ended, or `None` while it is still running.
    fn exit_info(&self) -> Option<ExitInfo>;
}

/// A freshly spawned process.
pub struct SpawnedProcess {
    /// Control handle for this process only.
    pub control: Arc<dyn ProcessControl>,
    /// Output lines followed by exactly one exit event.
    pub events: mpsc::UnboundedReceiver<ProcessEvent>,
}

impl std::fmt::Debug for SpawnedProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnedProcess")
            .field("pid", &self.control.pid())
            .finish_non_exhaustive()
    }
}

/// Why a spawn failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpawnError {
    /// The executable does not exist.
    #[error("Executable not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// Any other OS error.
    #[error("Failed to spawn {}: {reason}", .path.display())]
    Io { path: PathBuf, reason: String },
}

impl SpawnError {
    /// Classify an OS spawn error for `path`.
    #[must_use]
    pub fn from_io(path: &Path, err: &io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::Io {
                path: path.to_path_buf(),
                reason: err.to_string(),
            }
        }
    }
}

/// Launches server processes.
pub trait ProcessSpawner: Send + Sync {
    /// Spawn the process described by `request`.
    ///
    /// Must be called from within a tokio runtime; implementations start
    /// background tasks that feed the event stream.
    fn spawn(&self, request: &SpawnRequest) -> Result<SpawnedProcess, SpawnError>;
}

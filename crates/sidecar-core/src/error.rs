//! Startup failure taxonomy.
//!
//! These errors never cross the supervisor boundary as `Err` values. The
//! supervisor renders them into its last-error string on entry to
//! [`ProcessState::Error`](crate::ProcessState::Error).

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::diagnostics::{ExitReport, StderrBuffer, port_conflict_hint};
use crate::ports::SpawnError;

/// Why a start attempt ended in the error state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SupervisorError {
    /// No project directory configured.
    #[error("Project directory not configured")]
    MissingProjectDirectory,

    /// The spawn working directory could not be resolved.
    #[error("Cannot determine home directory to launch the server from")]
    HomeDirUnavailable,

    /// Something other than the server already listens on the port.
    #[error("Port {port} is already in use by another process. {hint}", hint = port_conflict_hint())]
    PortConflict { port: u16 },

    /// The OS reported the executable does not exist.
    #[error("Executable not found at '{}'", .path.display())]
    ExecutableNotFound { path: PathBuf },

    /// Any other OS-level spawn failure.
    #[error("Failed to start: {reason}")]
    SpawnFailed { reason: String },

    /// The process died with a nonzero code before becoming healthy.
    #[error("{0}")]
    EarlyExit(ExitReport),

    /// The process went away before becoming healthy, without a failure code.
    #[error("Process exited before server became ready")]
    ExitedBeforeReady,

    /// The process stayed alive but never became healthy.
    #[error("Server failed to start within {}ms", .timeout.as_millis())]
    StartupTimeout { timeout: Duration },
}

impl SupervisorError {
    /// Classify a spawned attempt that did not become healthy.
    ///
    /// `exit_code` is the nonzero exit code recorded during startup, if any.
    /// `exited` must be sampled before the process is cleaned up, otherwise a
    /// process terminated by the cleanup itself would look like it died.
    #[must_use]
    pub fn startup_failure(
        exit_code: Option<i32>,
        exited: bool,
        port: u16,
        stderr: &StderrBuffer,
        timeout: Duration,
    ) -> Self {
        match exit_code {
            Some(code) => Self::EarlyExit(ExitReport::from_stderr(code, port, stderr)),
            None if exited => Self::ExitedBeforeReady,
            None => Self::StartupTimeout { timeout },
        }
    }
}

impl From<SpawnError> for SupervisorError {
    fn from(err: SpawnError) -> Self {
        match err {
            SpawnError::NotFound { path } => Self::ExecutableNotFound { path },
            SpawnError::Io { reason, .. } => Self::SpawnFailed { reason },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_conflict_names_port_and_remedy() {
        let message = SupervisorError::PortConflict { port: 14096 }.to_string();
        assert!(message.contains("14096"));
        assert!(message.contains("choose a different port"));
    }

    #[test]
    fn test_spawn_error_classification() {
        let not_found: SupervisorError = SpawnError::NotFound {
            path: PathBuf::from("/opt/missing/opencode"),
        }
        .into();
        assert_eq!(
            not_found.to_string(),
            "Executable not found at '/opt/missing/opencode'"
        );

        let other: SupervisorError = SpawnError::Io {
            path: PathBuf::from("opencode"),
            reason: "Permission denied (os error 13)".to_string(),
        }
        .into();
        assert_eq!(
            other.to_string(),
            "Failed to start: Permission denied (os error 13)"
        );
    }

    #[test]
    fn test_timeout_message() {
        let err = SupervisorError::StartupTimeout {
            timeout: Duration::from_millis(3000),
        };
        assert_eq!(err.to_string(), "Server failed to start within 3000ms");
    }

    #[test]
    fn test_early_exit_delegates_to_report() {
        let mut stderr = StderrBuffer::new();
        stderr.push("fatal: bad flag");
        let err = SupervisorError::EarlyExit(ExitReport::from_stderr(3, 14096, &stderr));
        assert_eq!(
            err.to_string(),
            "Process exited unexpectedly (exit code 3)\nfatal: bad flag"
        );
    }

    #[test]
    fn test_startup_failure_classification() {
        let mut stderr = StderrBuffer::new();
        stderr.push("Error: listen EADDRINUSE: address already in use 127.0.0.1:14096");
        let timeout = Duration::from_secs(30);

        match SupervisorError::startup_failure(Some(7), true, 14096, &stderr, timeout) {
            SupervisorError::EarlyExit(report) => {
                assert_eq!(report.code, 7);
                assert!(report.port_conflict);
            }
            other => panic!("unexpected {other:?}"),
        }

        assert_eq!(
            SupervisorError::startup_failure(None, true, 14096, &stderr, timeout),
            SupervisorError::ExitedBeforeReady
        );
        assert_eq!(
            SupervisorError::startup_failure(None, false, 14096, &stderr, timeout),
            SupervisorError::StartupTimeout { timeout }
        );
    }
}

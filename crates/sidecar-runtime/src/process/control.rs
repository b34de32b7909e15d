//! Control handle bound to one spawned child.

use std::sync::{Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use sidecar_core::ports::{ExitInfo, ProcessControl, ProcessError};

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// [`ProcessControl`] for a child owned by the exit waiter task.
///
/// The waiter owns the `tokio::process::Child`; a forceful kill is requested
/// through `kill_requested` and performed by the waiter, which is the only
/// place allowed to reap the child.
#[derive(Debug)]
pub struct ChildControl {
    pid: Option<u32>,
    exit: Mutex<Option<ExitInfo>>,
    kill_requested: CancellationToken,
}

impl ChildControl {
    pub(crate) fn new(pid: Option<u32>, kill_requested: CancellationToken) -> Self {
        Self {
            pid,
            exit: Mutex::new(None),
            kill_requested,
        }
    }

    pub(crate) fn record_exit(&self, info: ExitInfo) {
        *self.exit.lock().unwrap_or_else(PoisonError::into_inner) = Some(info);
    }

    fn has_exited(&self) -> bool {
        self.exit_info().is_some()
    }
}

impl ProcessControl for ChildControl {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    #[cfg(unix)]
    fn terminate(&self) -> Result<(), ProcessError> {
        if self.has_exited() {
            return Ok(());
        }
        let Some(pid) = self.pid else {
            return Ok(());
        };

        let raw = i32::try_from(pid).map_err(|e| ProcessError::SignalFailed {
            pid: Some(pid),
            reason: e.to_string(),
        })?;

        debug!(pid, "Sending SIGTERM");
        match signal::kill(Pid::from_raw(raw), Signal::SIGTERM) {
            // Process may have already exited
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(ProcessError::SignalFailed {
                pid: Some(pid),
                reason: e.to_string(),
            }),
        }
    }

    #[cfg(not(unix))]
    fn terminate(&self) -> Result<(), ProcessError> {
        // No SIGTERM equivalent - terminate immediately
        self.kill()
    }

    fn kill(&self) -> Result<(), ProcessError> {
        if self.has_exited() {
            return Ok(());
        }
        debug!(pid = ?self.pid, "Requesting forceful kill");
        self.kill_requested.cancel();
        Ok(())
    }

    fn exit_info(&self) -> Option<ExitInfo> {
        *self.exit.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

//! Graceful shutdown with SIGTERM → SIGKILL escalation.
//!
//! # Strategy
//! 1. Send SIGTERM to the captured process
//! 2. Arm a one-shot timer for the grace period
//! 3. If that same process has not exited when the timer fires, kill it
//!
//! The timer never looks at "the current" process, so a stale timer from a
//! previous cycle cannot touch a newer child.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use sidecar_core::ports::ProcessControl;

/// Grace period between SIGTERM and SIGKILL.
pub const FORCE_KILL_GRACE: Duration = Duration::from_millis(2000);

/// Deferred forceful kill bound to one specific process.
#[derive(Debug)]
pub struct ForceKillTimer {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ForceKillTimer {
    /// Arm the timer on the current tokio runtime.
    ///
    /// `exited` must be cancelled once the captured process has exited; the
    /// timer then finishes without signalling.
    pub fn arm(
        control: Arc<dyn ProcessControl>,
        exited: CancellationToken,
        grace: Duration,
    ) -> Self {
        Self::arm_on(&Handle::current(), control, exited, grace)
    }

    fn arm_on(
        runtime: &Handle,
        control: Arc<dyn ProcessControl>,
        exited: CancellationToken,
        grace: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();

        let handle = runtime.spawn(async move {
            let pid = control.pid();
            tokio::select! {
                () = cancel_clone.cancelled() => {
                    debug!(?pid, "Force-kill timer cancelled");
                    return;
                }
                () = exited.cancelled() => {
                    debug!(?pid, "Process exited within grace period");
                    return;
                }
                () = sleep(grace) => {}
            }

            if control.exit_info().is_some() {
                return;
            }

            warn!(?pid, grace_ms = grace.as_millis(), "Process ignored SIGTERM, escalating to SIGKILL");
            if let Err(e) = control.kill() {
                error!(?pid, error = %e, "Failed to kill process");
            }
        });

        Self { cancel, handle }
    }

    /// Disarm the timer. The captured process is left alone.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the timer has fired or been disarmed.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait until the timer has fired or been disarmed.
    pub async fn wait(self) {
        if let Err(e) = self.handle.await {
            error!(error = %e, "Force-kill timer task failed");
        }
    }
}

/// Ask `control` to exit and arm a [`ForceKillTimer`] behind it.
///
/// Outside a tokio runtime nothing can wait out the grace period, so the
/// process is killed immediately and `None` is returned.
pub fn terminate_gracefully(
    control: Arc<dyn ProcessControl>,
    exited: CancellationToken,
    grace: Duration,
) -> Option<ForceKillTimer> {
    let pid = control.pid();
    if let Err(e) = control.terminate() {
        warn!(?pid, error = %e, "Failed to send SIGTERM");
    }

    if let Ok(runtime) = Handle::try_current() {
        Some(ForceKillTimer::arm_on(&runtime, control, exited, grace))
    } else {
        warn!(?pid, "No async runtime to wait out the grace period, killing now");
        if let Err(e) = control.kill() {
            error!(?pid, error = %e, "Failed to kill process");
        }
        None
    }
}

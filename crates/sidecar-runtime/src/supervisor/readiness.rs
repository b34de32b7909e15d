//! Readiness race: health polling against process exit and startup timeout.

use std::time::Duration;

use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use sidecar_core::ports::HealthProbe;

/// Per-request limit for health probes.
pub const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_millis(2000);

/// Delay between two readiness probes.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How a readiness wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The health endpoint answered with success.
    Ready,
    /// The process exited first.
    Exited,
    /// The attempt was abandoned by a stop.
    Abandoned,
    /// Neither happened within the startup timeout.
    TimedOut,
}

/// Poll `url` until it is healthy, `exited` or `abandoned` fires, or `limit`
/// elapses.
///
/// Every iteration checks for process death before probing; both the probe
/// and the pause between probes are cut short by an exit.
pub async fn wait_until_ready(
    health: &dyn HealthProbe,
    url: &str,
    exited: &CancellationToken,
    abandoned: &CancellationToken,
    limit: Duration,
) -> Readiness {
    let poll = async {
        let mut attempt = 0u32;
        loop {
            if abandoned.is_cancelled() {
                return Readiness::Abandoned;
            }
            if exited.is_cancelled() {
                return Readiness::Exited;
            }

            attempt += 1;
            tokio::select! {
                healthy = health.probe_health(url, HEALTH_PROBE_TIMEOUT) => {
                    if healthy {
                        return Readiness::Ready;
                    }
                    trace!(attempt, %url, "Server not ready yet");
                }
                () = exited.cancelled() => return Readiness::Exited,
                () = abandoned.cancelled() => return Readiness::Abandoned,
            }

            tokio::select! {
                () = sleep(POLL_INTERVAL) => {}
                () = exited.cancelled() => return Readiness::Exited,
                () = abandoned.cancelled() => return Readiness::Abandoned,
            }
        }
    };

    timeout(limit, poll).await.unwrap_or(Readiness::TimedOut)
}

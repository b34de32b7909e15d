//! Readiness and port-contention probes.

use std::time::Duration;

use async_trait::async_trait;

/// Bounded-timeout check that the server answers its health endpoint.
///
/// Implementations absorb every failure (non-success status, refused
/// connection, timeout) into `false`.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Probe `url`, giving up after `timeout`.
    async fn probe_health(&self, url: &str, timeout: Duration) -> bool;
}

/// Raw connectivity check used to tell "nothing listening" apart from
/// "something unresponsive is listening".
#[async_trait]
pub trait PortProbe: Send + Sync {
    /// Returns `true` if a TCP connection to `host:port` succeeds within
    /// `timeout`.
    async fn probe_tcp(&self, host: &str, port: u16, timeout: Duration) -> bool;
}

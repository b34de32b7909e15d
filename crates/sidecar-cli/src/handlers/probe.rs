//! Probe command handler.

use std::path::Path;

use sidecar_core::{HealthProbe, PortProbe, Settings};
use sidecar_runtime::{HEALTH_PROBE_TIMEOUT, HttpHealthProbe, PORT_PROBE_TIMEOUT, TcpPortProbe};

use super::load;
use crate::error::CliError;

/// Outcome of probing the configured server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReport {
    pub healthy: bool,
    pub port_in_use: bool,
}

impl ProbeReport {
    /// One-line verdict, phrased the way a start attempt would treat it.
    #[must_use]
    pub const fn verdict(self) -> &'static str {
        match (self.healthy, self.port_in_use) {
            (true, _) => "a healthy server is running and would be reused",
            (false, true) => "the port is held by something that is not a healthy server",
            (false, false) => "nothing is listening; a start would spawn the server",
        }
    }
}

/// Execute the probe command.
pub async fn execute(config: Option<&Path>) -> Result<(), CliError> {
    let settings = load(config)?;
    let health = HttpHealthProbe::new().map_err(|e| CliError::Process(e.to_string()))?;
    let report = probe(&settings, &health, &TcpPortProbe).await;

    println!("Health:  {} -> {}", settings.health_url(), up_down(report.healthy));
    println!(
        "Port:    {}:{} -> {}",
        settings.hostname,
        settings.port,
        if report.port_in_use { "in use" } else { "free" }
    );
    println!("Verdict: {}", report.verdict());
    Ok(())
}

/// Run both probes with the timeouts a start attempt uses.
pub async fn probe(
    settings: &Settings,
    health: &dyn HealthProbe,
    port: &dyn PortProbe,
) -> ProbeReport {
    let healthy = health
        .probe_health(&settings.health_url(), HEALTH_PROBE_TIMEOUT)
        .await;
    let port_in_use = port
        .probe_tcp(&settings.hostname, settings.port, PORT_PROBE_TIMEOUT)
        .await;
    ProbeReport {
        healthy,
        port_in_use,
    }
}

const fn up_down(healthy: bool) -> &'static str {
    if healthy { "healthy" } else { "not responding" }
}

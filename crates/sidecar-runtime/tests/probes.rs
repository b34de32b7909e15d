//! Health and port probes against real sockets.

mod common;

use std::time::{Duration, Instant};

use tokio::net::TcpListener;

use sidecar_core::ports::{HealthProbe, PortProbe};
use sidecar_runtime::{HttpHealthProbe, TcpPortProbe};

const HEALTH_TIMEOUT: Duration = Duration::from_millis(2000);

#[tokio::test]
async fn test_health_probe_accepts_success_status() {
    let port = common::spawn_http_server(200).await;
    let probe = HttpHealthProbe::new().unwrap();

    let url = format!("http://127.0.0.1:{port}/global/health");
    assert!(probe.probe_health(&url, HEALTH_TIMEOUT).await);
}

#[tokio::test]
async fn test_health_probe_rejects_error_status() {
    let port = common::spawn_http_server(503).await;
    let probe = HttpHealthProbe::new().unwrap();

    let url = format!("http://127.0.0.1:{port}/global/health");
    assert!(!probe.probe_health(&url, HEALTH_TIMEOUT).await);
}

#[tokio::test]
async fn test_health_probe_gives_up_on_silent_listener() {
    // Accepts connections (via the backlog) but never answers
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let probe = HttpHealthProbe::new().unwrap();

    let started = Instant::now();
    let url = format!("http://127.0.0.1:{port}/global/health");
    assert!(!probe.probe_health(&url, Duration::from_millis(300)).await);
    assert!(started.elapsed() < Duration::from_secs(2));

    // ...while the raw connect still sees it
    assert!(
        TcpPortProbe
            .probe_tcp("127.0.0.1", port, Duration::from_millis(1000))
            .await
    );
}

#[tokio::test]
async fn test_port_probe_free_port() {
    let port = common::free_port().await;
    assert!(
        !TcpPortProbe
            .probe_tcp("127.0.0.1", port, Duration::from_millis(1000))
            .await
    );
}

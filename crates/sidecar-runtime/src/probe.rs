//! Network probe implementations.
//!
//! Both probes are intentionally minimal: one bounded attempt, a boolean
//! answer, no retries. Polling policy lives in the supervisor.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

use sidecar_core::ports::{HealthProbe, PortProbe};

/// Health probe issuing `GET` requests through a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpHealthProbe {
    client: Client,
}

impl HttpHealthProbe {
    /// Build a probe with its own client.
    ///
    /// Proxies are disabled: the server is always local and an inherited
    /// `HTTP_PROXY` would otherwise intercept loopback requests.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder().no_proxy().build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn probe_health(&self, url: &str, timeout: Duration) -> bool {
        match self.client.get(url).timeout(timeout).send().await {
            Ok(response) if response.status().is_success() => {
                trace!(%url, status = %response.status(), "Health probe succeeded");
                true
            }
            Ok(response) => {
                debug!(%url, status = %response.status(), "Health probe returned non-success status");
                false
            }
            Err(e) => {
                trace!(%url, error = %e, "Health probe failed");
                false
            }
        }
    }
}

/// Port probe that attempts a plain TCP connect.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpPortProbe;

#[async_trait]
impl PortProbe for TcpPortProbe {
    async fn probe_tcp(&self, host: &str, port: u16, limit: Duration) -> bool {
        let host = host.trim_start_matches('[').trim_end_matches(']');
        match timeout(limit, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => {
                debug!(%host, port, "Something is listening on the port");
                true
            }
            Ok(Err(e)) => {
                trace!(%host, port, error = %e, "TCP probe refused");
                false
            }
            Err(_) => {
                trace!(%host, port, "TCP probe timed out");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_probe_detects_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let probe = TcpPortProbe;
        assert!(
            probe
                .probe_tcp("127.0.0.1", port, Duration::from_millis(1000))
                .await
        );
    }

    #[tokio::test]
    async fn test_tcp_probe_nothing_listening() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let probe = TcpPortProbe;
        assert!(
            !probe
                .probe_tcp("127.0.0.1", port, Duration::from_millis(1000))
                .await
        );
    }

    #[tokio::test]
    async fn test_health_probe_connection_refused_is_false() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let probe = HttpHealthProbe::new().unwrap();
        let url = format!("http://127.0.0.1:{port}/global/health");
        assert!(!probe.probe_health(&url, Duration::from_millis(500)).await);
    }
}

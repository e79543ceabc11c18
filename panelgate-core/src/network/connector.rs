//! Endpoint resolution and connect attempts.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpStream, lookup_host};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::GateError;

/// Default deadline for a single connect attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(120);

/// Where the controller lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connector {
    host: String,
    port: u16,
    connect_timeout: Duration,
}

impl Connector {
    pub fn new(host: impl Into<String>, port: u16, connect_timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout,
        }
    }

    /// Every address `host:port` resolves to, in resolver order.
    pub async fn resolve(&self) -> Result<Vec<SocketAddr>, GateError> {
        let endpoints: Vec<SocketAddr> = lookup_host((self.host.as_str(), self.port))
            .await?
            .collect();
        if endpoints.is_empty() {
            return Err(GateError::Protocol(format!(
                "{}:{} resolved to no addresses",
                self.host, self.port
            )));
        }
        Ok(endpoints)
    }

    /// One connect cycle: try each endpoint in turn until one accepts.
    ///
    /// Fails with the last endpoint's error when none did.
    pub async fn connect(&self, cancel: &CancellationToken) -> Result<TcpStream, GateError> {
        let endpoints = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GateError::Cancelled),
            resolved = self.resolve() => resolved?,
        };
        debug!(host = %self.host, endpoints = endpoints.len(), "resolved controller");

        let mut last = GateError::Other(format!("no endpoint for {}", self.host));
        for addr in endpoints {
            let attempt = tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr));
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GateError::Cancelled),
                result = attempt => result,
            };
            match result {
                Ok(Ok(stream)) => {
                    stream.set_nodelay(true)?;
                    info!(%addr, "connected to controller");
                    return Ok(stream);
                }
                Ok(Err(e)) => {
                    warn!(%addr, "connect failed: {e}");
                    last = e.into();
                }
                Err(_) => {
                    warn!(%addr, timeout = ?self.connect_timeout, "connect timed out");
                    last = GateError::Timeout(self.connect_timeout);
                }
            }
        }
        Err(last)
    }
}

/// Sleep between connect cycles unless cancelled first.
pub async fn retry_delay(delay: Duration, cancel: &CancellationToken) -> Result<(), GateError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(GateError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

//! TCP listener with accept retry.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections
//! - Back off and retry when `accept` fails (e.g. out of file descriptors)

use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};

use crate::net::backoff::{calculate_backoff, ACCEPT_BASE_DELAY_MS, ACCEPT_MAX_DELAY_MS};

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to address.
    Bind {
        address: String,
        source: std::io::Error,
    },
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind { address, source } => {
                write!(f, "Failed to bind {}: {}", address, source)
            }
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Bind { source, .. } => Some(source),
        }
    }
}

/// Accepting side of the server socket.
pub struct Listener {
    inner: TcpListener,
    /// Consecutive accept failures, reset on success.
    failures: u32,
}

impl Listener {
    /// Bind to `address` (`host:port`, host names are resolved).
    pub async fn bind(address: &str) -> Result<Self, ListenerError> {
        let bind_error = |source| ListenerError::Bind {
            address: address.to_string(),
            source,
        };

        let listener = TcpListener::bind(address).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        tracing::info!(address = %local_addr, "Listener bound");

        Ok(Self {
            inner: listener,
            failures: 0,
        })
    }

    /// Accept the next connection, retrying with back-off on errors.
    ///
    /// Cancel-safe: dropping the future loses no accepted connection.
    pub async fn accept(&mut self) -> (TcpStream, SocketAddr) {
        loop {
            match self.inner.accept().await {
                Ok((stream, addr)) => {
                    self.failures = 0;
                    tracing::debug!(peer_addr = %addr, "Connection accepted");
                    return (stream, addr);
                }
                Err(e) => {
                    self.failures = self.failures.saturating_add(1);
                    let delay =
                        calculate_backoff(self.failures, ACCEPT_BASE_DELAY_MS, ACCEPT_MAX_DELAY_MS);
                    tracing::warn!(
                        error = %e,
                        attempt = self.failures,
                        delay = ?delay,
                        "Accept failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }
}

//! Server lifecycle: accept loop and per-connection tasks.
//!
//! # Responsibilities
//! - Bind the listening socket; a bind failure is returned to the caller
//! - Spawn one task per accepted connection, each running a
//!   `ConnectionDispatcher` over an `HttpTransport`
//! - Stop accepting on shutdown
//!
//! # Design Decisions
//! - No bound on concurrent connections and no queueing
//! - Shutdown does not cancel in-flight connections; their tasks run to
//!   their own close
//! - The behaviour is built once and shared through an `Arc`

use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};
use tracing::Instrument;

use crate::behaviour::Behaviour;
use crate::http::{ConnectionDispatcher, HttpTransport};
use crate::lifecycle::signals::wait_for_interrupt;
use crate::lifecycle::Shutdown;
use crate::net::{ConnectionGuard, ConnectionTracker, Listener, ListenerError};

/// Error type for server lifecycle operations.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Bind(#[from] ListenerError),

    #[error("failed to read the bound address: {0}")]
    LocalAddr(#[source] std::io::Error),

    #[error("accept loop terminated abnormally: {0}")]
    AcceptLoop(#[from] JoinError),
}

/// A running server.
pub struct Server {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    tracker: ConnectionTracker,
    accept_loop: JoinHandle<()>,
}

impl Server {
    /// Bind `address` and start accepting in the background.
    pub async fn start(address: &str, behaviour: Arc<dyn Behaviour>) -> Result<Self, ServerError> {
        let listener = Listener::bind(address).await?;
        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

        let shutdown = Shutdown::new();
        let tracker = ConnectionTracker::new();
        let accept_loop = tokio::spawn(accept_loop(
            listener,
            behaviour,
            tracker.clone(),
            shutdown.subscribe(),
        ));

        tracing::info!(address = %local_addr, "Server started");

        Ok(Self {
            local_addr,
            shutdown,
            tracker,
            accept_loop,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Connections accepted and not yet closed.
    pub fn active_connections(&self) -> u64 {
        self.tracker.active_count()
    }

    /// Stop accepting and wait for the accept loop to exit.
    ///
    /// Connections already accepted keep running.
    pub async fn shutdown(self) -> Result<(), ServerError> {
        self.shutdown.trigger();
        self.accept_loop.await?;

        tracing::info!(
            in_flight = self.tracker.active_count(),
            "Stopped accepting connections"
        );
        Ok(())
    }

    /// Serve until SIGINT or SIGTERM, then shut down.
    pub async fn run_until_interrupted(self) -> Result<(), ServerError> {
        wait_for_interrupt().await;
        self.shutdown().await
    }
}

async fn accept_loop(
    mut listener: Listener,
    behaviour: Arc<dyn Behaviour>,
    tracker: ConnectionTracker,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => break,
            (stream, peer_addr) = listener.accept() => {
                spawn_connection(stream, peer_addr, Arc::clone(&behaviour), tracker.track());
            }
        }
    }
    tracing::debug!("Accept loop exited");
}

fn spawn_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    behaviour: Arc<dyn Behaviour>,
    guard: ConnectionGuard,
) {
    let connection_id = guard.id();
    let span = tracing::info_span!(
        "connection",
        connection_id = %connection_id,
        peer_addr = %peer_addr
    );

    tokio::spawn(
        async move {
            let dispatcher =
                ConnectionDispatcher::new(HttpTransport::new(stream), behaviour, connection_id);
            let outcome = dispatcher.run().await;
            tracing::debug!(?outcome, "Connection finished");
            drop(guard);
        }
        .instrument(span),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviour::printer::tests::test_printer;
    use crate::behaviour::RejectAll;
    use crate::ppd::DocumentFormat;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn reject_all() -> Arc<dyn Behaviour> {
        Arc::new(RejectAll::new(test_printer(DocumentFormat::Postscript)))
    }

    #[tokio::test]
    async fn bind_failure_is_returned() {
        let first = Server::start("127.0.0.1:0", reject_all()).await.unwrap();
        let address = first.local_addr().to_string();

        let second = Server::start(&address, reject_all()).await;

        assert!(matches!(second, Err(ServerError::Bind(_))));
        first.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn in_flight_connection_survives_shutdown() {
        let server = Server::start("127.0.0.1:0", reject_all()).await.unwrap();
        let addr = server.local_addr();

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();
        while server.active_connections() == 0 {
            tokio::task::yield_now().await;
        }

        server.shutdown().await.unwrap();

        client.write_all(b"\r\n").await.unwrap();
        let mut response = String::new();
        client.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    }
}

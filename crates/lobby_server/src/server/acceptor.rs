//! The admission loop.
//!
//! The [`Acceptor`] owns the listening socket for the lifetime of the
//! server. Each iteration it gates on capacity, accepts one client, admits
//! it into a slot and spawns a handler task for it. The loop ends when
//! shutdown is requested or when accepting fails; in both cases the
//! listener is dropped and no further clients are admitted, while already
//! admitted connections keep running.

use crate::{
    connection::{ClientConnection, ClientStream, Protocol},
    server::handlers::handle_connection,
    state::ServerState,
};
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// Source of incoming client streams.
#[async_trait]
pub trait Listener: Send + 'static {
    type Stream: ClientStream + 'static;

    /// Waits for the next client.
    async fn accept(&mut self) -> io::Result<(Self::Stream, SocketAddr)>;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

#[async_trait]
impl Listener for TcpListener {
    type Stream = TcpStream;

    async fn accept(&mut self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(&*self).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpListener::local_addr(self)
    }
}

/// Why the accept loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptorExit {
    /// Shutdown was requested
    Shutdown,
    /// Accepting failed; admission stopped permanently
    AcceptFailed(io::ErrorKind),
    /// The acceptor task panicked or was aborted
    Crashed,
}

/// Owns the listener and runs the admission loop.
pub struct Acceptor<L: Listener> {
    listener: L,
    state: Arc<ServerState>,
    protocol: Arc<dyn Protocol>,
    backoff: Duration,
}

impl<L: Listener> Acceptor<L> {
    pub fn new(
        listener: L,
        state: Arc<ServerState>,
        protocol: Arc<dyn Protocol>,
        backoff: Duration,
    ) -> Self {
        Self {
            listener,
            state,
            protocol,
            backoff,
        }
    }

    /// Runs until shutdown or the first accept failure.
    pub async fn run(mut self) -> AcceptorExit {
        let mut shutdown = self.state.shutdown_signal();

        let exit = loop {
            if self.state.is_shutting_down() {
                break AcceptorExit::Shutdown;
            }

            if !self.state.has_capacity() {
                debug!(
                    "🚧 Lobby full ({}/{}), backing off",
                    self.state.occupancy(),
                    self.state.capacity()
                );
                tokio::select! {
                    _ = shutdown.wait() => break AcceptorExit::Shutdown,
                    _ = self.state.wait_for_slot(self.backoff) => continue,
                }
            }

            info!("⏳ Waiting for client to join...");
            let accepted = tokio::select! {
                biased;
                _ = shutdown.wait() => break AcceptorExit::Shutdown,
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => self.admit(stream, peer),
                Err(e) => {
                    error!("❌ Failed to accept connection: {}", e);
                    break AcceptorExit::AcceptFailed(e.kind());
                }
            }
        };

        match exit {
            AcceptorExit::Shutdown => info!("🛑 Accept loop stopping - shutdown initiated"),
            _ => warn!("🛑 Accept loop stopped - no further clients will be admitted"),
        }
        exit
    }

    fn admit(&self, stream: L::Stream, peer: SocketAddr) {
        if self.state.is_shutting_down() {
            info!("🚪 Turning away {} - shutdown in progress", peer);
            return;
        }

        // Only this task admits, so the capacity check above still holds.
        let Some(slot) = self.state.try_admit_slot() else {
            warn!("🚫 Turning away {} - lobby full", peer);
            return;
        };

        let connection = ClientConnection::new(stream, peer, slot);
        info!(
            "🔗 Someone joined! Connection {} from {} ({}/{})",
            connection.id(),
            peer,
            self.state.occupancy(),
            self.state.capacity()
        );

        tokio::spawn(handle_connection(
            connection,
            self.state.clone(),
            self.protocol.clone(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{EchoProtocol, IdleProtocol};
    use crate::test_support::scripted_listener;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::time::{sleep, timeout};

    const BACKOFF: Duration = Duration::from_millis(100);

    async fn eventually(mut condition: impl FnMut() -> bool) {
        timeout(Duration::from_secs(2), async {
            while !condition() {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_admits_up_to_capacity_then_waits() {
        let (listener, script) = scripted_listener();
        let state = Arc::new(ServerState::new(1));
        let acceptor = Acceptor::new(listener, state.clone(), Arc::new(IdleProtocol), BACKOFF);
        let task = tokio::spawn(acceptor.run());

        let first = script.connect();
        let _second = script.connect();
        eventually(|| state.occupancy() == 1).await;

        sleep(BACKOFF * 3).await;
        assert_eq!(state.snapshot().total_admitted, 1);

        drop(first);
        eventually(|| state.snapshot().total_admitted == 2).await;
        assert_eq!(state.occupancy(), 1);

        state.request_shutdown();
        assert_eq!(task.await.unwrap(), AcceptorExit::Shutdown);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_shutdown_unblocks_pending_accept() {
        let (listener, _script) = scripted_listener();
        let state = Arc::new(ServerState::new(4));
        let acceptor = Acceptor::new(listener, state.clone(), Arc::new(IdleProtocol), BACKOFF);
        let task = tokio::spawn(acceptor.run());

        sleep(Duration::from_millis(50)).await;
        assert!(!task.is_finished());

        state.request_shutdown();
        let exit = timeout(Duration::from_secs(1), task)
            .await
            .expect("acceptor should stop without a client connecting")
            .unwrap();
        assert_eq!(exit, AcceptorExit::Shutdown);
        assert_eq!(state.snapshot().total_admitted, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_shutdown_while_full_stops_backoff() {
        let (listener, script) = scripted_listener();
        let state = Arc::new(ServerState::new(1));
        let acceptor = Acceptor::new(listener, state.clone(), Arc::new(IdleProtocol), Duration::from_secs(30));
        let task = tokio::spawn(acceptor.run());

        let _client = script.connect();
        eventually(|| state.occupancy() == 1).await;

        state.request_shutdown();
        let exit = timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
        assert_eq!(exit, AcceptorExit::Shutdown);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_accept_failure_stops_loop_but_not_connections() {
        let (listener, script) = scripted_listener();
        let state = Arc::new(ServerState::new(4));
        let acceptor = Acceptor::new(listener, state.clone(), Arc::new(EchoProtocol), BACKOFF);
        let task = tokio::spawn(acceptor.run());

        let mut client = script.connect();
        eventually(|| state.occupancy() == 1).await;

        script.fail(io::ErrorKind::ConnectionAborted);
        let exit = timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
        assert_eq!(exit, AcceptorExit::AcceptFailed(io::ErrorKind::ConnectionAborted));

        // Later clients are never admitted.
        let _late = script.connect();
        sleep(BACKOFF).await;
        assert_eq!(state.snapshot().total_admitted, 1);

        // The admitted client is still served.
        client.write_all(b"still here").await.unwrap();
        let mut reply = [0u8; 10];
        timeout(Duration::from_secs(1), client.read_exact(&mut reply))
            .await
            .expect("echo should arrive")
            .unwrap();
        assert_eq!(&reply, b"still here");
        assert_eq!(state.occupancy(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_nothing_admitted_after_shutdown() {
        let (listener, script) = scripted_listener();
        let state = Arc::new(ServerState::new(4));
        state.request_shutdown();

        let _client = script.connect();
        let acceptor = Acceptor::new(listener, state.clone(), Arc::new(IdleProtocol), BACKOFF);
        let exit = acceptor.run().await;

        assert_eq!(exit, AcceptorExit::Shutdown);
        assert_eq!(state.snapshot().total_admitted, 0);
    }
}

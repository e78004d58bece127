//! Core lobby server implementation.
//!
//! This module contains the `LobbyServer` struct, which binds the listener
//! and wires shared state, acceptor and protocol together, and the
//! `ServerHandle` used to observe and stop a running server.

use crate::{
    config::ServerConfig,
    connection::{IdleProtocol, Protocol},
    error::ServerError,
    server::acceptor::{Acceptor, AcceptorExit, Listener},
    state::ServerState,
};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// The lobby server before it starts accepting.
///
/// Construction binds (or adopts) the listening socket; [`LobbyServer::start`]
/// moves the listener into the accept loop on its own task.
pub struct LobbyServer<L: Listener = TcpListener> {
    /// Configuration parameters for server behavior
    config: ServerConfig,

    /// Capacity and shutdown state shared with every connection
    state: Arc<ServerState>,

    /// Listener handed to the acceptor on start
    listener: L,

    /// Protocol spoken with every admitted client
    protocol: Arc<dyn Protocol>,
}

impl LobbyServer<TcpListener> {
    /// Binds a TCP listener on the configured address.
    ///
    /// # Errors
    ///
    /// `ServerError::Bind` if the address cannot be acquired; binding is
    /// not retried. `ServerError::Config` for unusable configuration.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;
        info!("🚀 Starting lobby server on {}", config.bind_address);

        let listener = TcpListener::bind(config.bind_address)
            .await
            .map_err(|source| ServerError::Bind {
                address: config.bind_address,
                source,
            })?;

        Self::with_listener(config, listener)
    }
}

impl<L: Listener> LobbyServer<L> {
    /// Builds a server around an already bound listener.
    pub fn with_listener(config: ServerConfig, listener: L) -> Result<Self, ServerError> {
        config.validate()?;
        let state = Arc::new(ServerState::new(config.max_connections));
        Ok(Self {
            config,
            state,
            listener,
            protocol: Arc::new(IdleProtocol),
        })
    }

    /// Replaces the default [`IdleProtocol`].
    pub fn with_protocol(mut self, protocol: Arc<dyn Protocol>) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> Arc<ServerState> {
        self.state.clone()
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Spawns the accept loop and returns a handle to the running server.
    pub fn start(self) -> ServerHandle {
        let local_addr = self.listener.local_addr().ok();
        info!(
            "🎮 Admitting up to {} concurrent client(s) on {} using the {} protocol",
            self.config.max_connections,
            local_addr.map_or_else(|| "<unknown>".to_string(), |addr| addr.to_string()),
            self.protocol.name()
        );

        let acceptor = Acceptor::new(
            self.listener,
            self.state.clone(),
            self.protocol,
            self.config.backoff_interval(),
        );

        ServerHandle {
            state: self.state,
            local_addr,
            acceptor: AcceptorTask::Running(tokio::spawn(acceptor.run())),
        }
    }
}

enum AcceptorTask {
    Running(JoinHandle<AcceptorExit>),
    Stopped(AcceptorExit),
}

/// Summary of a completed shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// How the accept loop ended
    pub acceptor: AcceptorExit,
    /// Whether every connection was released within the drain timeout
    pub drained: bool,
    /// Connections still open when the report was taken
    pub remaining_connections: usize,
}

/// Handle to a running lobby server.
pub struct ServerHandle {
    state: Arc<ServerState>,
    local_addr: Option<SocketAddr>,
    acceptor: AcceptorTask,
}

impl ServerHandle {
    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    /// Address the listener was bound to, if known.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Sets the shutdown flag without waiting for anything.
    pub fn request_shutdown(&self) -> bool {
        self.state.request_shutdown()
    }

    /// Resolves when the accept loop has ended, for whatever reason.
    ///
    /// Safe to call repeatedly and to cancel; the exit is remembered.
    pub async fn acceptor_stopped(&mut self) -> AcceptorExit {
        let exit = match &mut self.acceptor {
            AcceptorTask::Stopped(exit) => return *exit,
            AcceptorTask::Running(task) => task.await.unwrap_or_else(|e| {
                error!("❌ Acceptor task failed: {}", e);
                AcceptorExit::Crashed
            }),
        };
        self.acceptor = AcceptorTask::Stopped(exit);
        exit
    }

    /// Requests shutdown, waits for the accept loop to end, then waits up
    /// to `drain_timeout` for every connection to be released.
    pub async fn shutdown(mut self, drain_timeout: Duration) -> ShutdownReport {
        self.state.request_shutdown();
        let acceptor = self.acceptor_stopped().await;

        info!(
            "⏳ Waiting up to {:?} for {} connection(s) to close...",
            drain_timeout,
            self.state.occupancy()
        );
        let drained = tokio::time::timeout(drain_timeout, self.state.drained())
            .await
            .is_ok();

        let remaining_connections = self.state.occupancy();
        if drained {
            info!("✅ All connections closed");
        } else {
            warn!(
                "⏰ Drain timeout reached with {} connection(s) still open",
                remaining_connections
            );
        }

        ShutdownReport {
            acceptor,
            drained,
            remaining_connections,
        }
    }
}

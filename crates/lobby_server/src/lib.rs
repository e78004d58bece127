//! # Lobby Server - Connection Admission Core
//!
//! The admission and lifecycle layer of a TCP game server that serves a
//! bounded number of concurrent clients. It decides *who gets in* and makes
//! sure every admitted client is cleaned up; what clients and server say to
//! each other is left to a pluggable [`Protocol`].
//!
//! ## Architecture Overview
//!
//! ### Core Components
//!
//! * **Server State** - Capacity, occupancy and the shutdown flag, shared by
//!   every task through an `Arc<ServerState>`
//! * **Acceptor** - Owns the listening socket, gates on capacity and spawns
//!   one handler task per admitted client
//! * **Connection Handler** - Owns one client stream, steps the protocol
//!   until shutdown, completion or failure, then releases stream and slot
//!
//! ### Admission Flow
//!
//! 1. The acceptor checks occupancy against capacity
//! 2. While full it waits for a release, at most one backoff interval at a time
//! 3. Otherwise it accepts, racing the accept against the shutdown signal
//! 4. The accepted stream is admitted into a slot and handed to a new task
//! 5. The handler releases the slot on every exit path
//!
//! ```no_run
//! use lobby_server::{LobbyServer, ServerConfig};
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig {
//!     max_connections: 2,
//!     ..Default::default()
//! };
//! let handle = LobbyServer::bind(config).await?.start();
//!
//! // ... later
//! let report = handle.shutdown(Duration::from_secs(5)).await;
//! assert!(report.drained);
//! # Ok(())
//! # }
//! ```
//!
//! ## Shutdown
//!
//! [`ServerState::request_shutdown`] flips a monotonic flag and pushes it to
//! every waiting task. The acceptor stops even when blocked in `accept`,
//! dropping the listener; connection handlers stop even when blocked in
//! protocol I/O.
//!
//! ## Error Handling
//!
//! * [`ServerError`] - bind and configuration failures, returned to the caller
//! * [`ConnectionError`] - contained to a single connection and logged
//! * Accept failures stop admission permanently and are logged; existing
//!   connections are unaffected

// Re-export core types and functions for easy access
pub use config::ServerConfig;
pub use connection::{
    ClientConnection, ClientStream, ConnectionId, ConnectionInfo, ConnectionPhase, EchoProtocol,
    IdleProtocol, Protocol, Step,
};
pub use error::{ConnectionError, ServerError};
pub use server::{AcceptorExit, CloseReason, Listener, LobbyServer, ServerHandle, ShutdownReport};
pub use state::{ServerState, ShutdownSignal, SlotGuard, StateSnapshot};
pub use utils::{create_server, create_server_with_config};

// Public module declarations
pub mod config;
pub mod connection;
pub mod error;
pub mod server;
pub mod state;
pub mod utils;

#[cfg(test)]
mod test_support;

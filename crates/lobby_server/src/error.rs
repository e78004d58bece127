//! Error types and handling for the lobby server.
//!
//! Errors are split by the component that owns the failing resource:
//! [`ServerError`] for construction of the server itself and
//! [`ConnectionError`] for failures confined to a single client connection.
//! Accept failures and socket release failures are logged where they happen
//! and never surface as values.

use std::net::SocketAddr;

/// Failures while constructing or starting the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listening socket could not be created. Not retried.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The supplied configuration cannot describe a working server
    #[error("Invalid server configuration: {0}")]
    Config(String),
}

/// Failures inside one connection's lifecycle.
///
/// Always terminal for that connection only.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Transport-level read or write failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The protocol hook rejected the client
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The protocol hook panicked; the panic was contained by the handler
    #[error("Protocol hook panicked: {0}")]
    Panicked(String),
}

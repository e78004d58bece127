//! Core server implementation and connection handling.
//!
//! This module contains the lobby server structure, the admission loop and
//! the per-connection handler task.

pub mod acceptor;
pub mod core;
pub mod handlers;

pub use acceptor::{Acceptor, AcceptorExit, Listener};
pub use self::core::{LobbyServer, ServerHandle, ShutdownReport};
pub use handlers::{handle_connection, CloseReason};

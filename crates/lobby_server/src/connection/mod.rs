//! Client connection representation and the per-connection protocol hook.
//!
//! A [`ClientConnection`] owns one accepted stream together with the slot it
//! occupies. The application protocol spoken over that stream is supplied
//! from outside through the [`Protocol`] trait.

pub mod client;
pub mod protocol;

pub use client::{ClientConnection, ConnectionInfo, ConnectionPhase};
pub use protocol::{ClientStream, EchoProtocol, IdleProtocol, Protocol, Step};

/// Type alias for connection identifiers.
///
/// Connection IDs are assigned at admission, start at 1 and are never
/// reused within one server instance.
pub type ConnectionId = usize;

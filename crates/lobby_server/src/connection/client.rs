//! Client connection representation and lifecycle.
//!
//! This module defines the structure owning an individual admitted client:
//! its stream, its occupancy slot and its position in the connection state
//! machine.

use super::{protocol::ClientStream, ConnectionId};
use crate::state::SlotGuard;
use std::net::SocketAddr;
use std::time::SystemTime;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Lifecycle phase of a connection.
///
/// `Admitted -> Active -> Closing -> Closed`. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Accepted and counted against capacity, protocol not started yet
    Admitted,
    /// The protocol loop is running
    Active,
    /// The stream is being shut down
    Closing,
    /// Stream and slot released
    Closed,
}

/// Identity of a connection as seen by protocol hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub id: ConnectionId,
    pub peer: SocketAddr,
}

/// Represents an individual admitted client.
///
/// The connection exclusively owns its stream and its [`SlotGuard`]; both
/// are released by [`ClientConnection::close`], or by drop if the owning
/// task never gets that far.
#[derive(Debug)]
pub struct ClientConnection<S> {
    /// Identifier assigned at admission
    id: ConnectionId,

    /// The remote network address of the client
    peer: SocketAddr,

    /// When this connection was admitted
    admitted_at: SystemTime,

    /// The client stream, `None` once closed
    stream: Option<S>,

    /// Occupancy slot, `None` once closed
    slot: Option<SlotGuard>,

    phase: ConnectionPhase,
}

impl<S: ClientStream> ClientConnection<S> {
    /// Wraps a freshly accepted stream and the slot it was admitted into.
    pub fn new(stream: S, peer: SocketAddr, slot: SlotGuard) -> Self {
        Self {
            id: slot.connection_id(),
            peer,
            admitted_at: SystemTime::now(),
            stream: Some(stream),
            slot: Some(slot),
            phase: ConnectionPhase::Admitted,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn admitted_at(&self) -> SystemTime {
        self.admitted_at
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id,
            peer: self.peer,
        }
    }

    /// Moves an admitted connection into the active phase.
    pub fn activate(&mut self) {
        if self.phase == ConnectionPhase::Admitted {
            self.phase = ConnectionPhase::Active;
        }
    }

    /// Mutable access to the stream while the connection is open.
    pub fn stream_mut(&mut self) -> Option<&mut S> {
        self.stream.as_mut()
    }

    /// Shuts the stream down and gives back the occupancy slot.
    ///
    /// Runs the release exactly once; calling it again on a closed
    /// connection does nothing. A failing stream shutdown is logged and
    /// does not prevent the slot from being released.
    pub async fn close(&mut self) {
        if self.phase == ConnectionPhase::Closed {
            return;
        }
        self.phase = ConnectionPhase::Closing;

        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                warn!("⚠️ Could not close socket of connection {}: {}", self.id, e);
            }
        }
        if let Some(slot) = self.slot.take() {
            slot.release();
        }

        self.phase = ConnectionPhase::Closed;
        info!("❌ Connection {} from {} disconnected", self.id, self.peer);
    }
}

//! Connection handling logic for admitted clients.
//!
//! This module contains the per-connection task that drives the protocol
//! hook for one client from admission to cleanup.

use crate::{
    connection::{ClientConnection, ClientStream, Protocol, Step},
    error::ConnectionError,
    state::{ServerState, ShutdownSignal},
};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Why a connection ended.
#[derive(Debug)]
pub enum CloseReason {
    /// The shutdown flag was observed
    Shutdown,
    /// The protocol reported completion
    Finished,
    /// The protocol or the transport failed
    Failed(ConnectionError),
}

/// Handles a single client connection from admission to cleanup.
///
/// # Connection Flow
///
/// 1. Mark the connection active and run the protocol's admission hook
/// 2. Step the protocol until it finishes, fails, or shutdown is observed
/// 3. Close the stream and release the occupancy slot
///
/// Every failure, including a panic inside the protocol, is contained here
/// and ends only this connection. The stream and slot are released exactly
/// once regardless of how the loop ended.
pub async fn handle_connection<S: ClientStream + 'static>(
    mut connection: ClientConnection<S>,
    state: Arc<ServerState>,
    protocol: Arc<dyn Protocol>,
) -> CloseReason {
    let mut shutdown = state.shutdown_signal();
    let reason = drive(&mut connection, &state, &mut shutdown, protocol.as_ref()).await;

    match &reason {
        CloseReason::Shutdown => {
            info!("🛑 Connection {} closing - server shutting down", connection.id())
        }
        CloseReason::Finished => {
            debug!("🔌 Connection {} finished ({})", connection.id(), protocol.name())
        }
        CloseReason::Failed(e) => {
            error!("Connection {} error: {}", connection.id(), e)
        }
    }

    connection.close().await;
    reason
}

async fn drive<S: ClientStream>(
    connection: &mut ClientConnection<S>,
    state: &ServerState,
    shutdown: &mut ShutdownSignal,
    protocol: &dyn Protocol,
) -> CloseReason {
    let info = connection.info();
    connection.activate();

    let Some(stream) = connection.stream_mut() else {
        return CloseReason::Finished;
    };
    let stream: &mut dyn ClientStream = stream;

    if state.is_shutting_down() {
        return CloseReason::Shutdown;
    }
    tokio::select! {
        biased;
        _ = shutdown.wait() => return CloseReason::Shutdown,
        admitted = contain(protocol.on_admitted(&mut *stream, &info)) => {
            if let Err(e) = admitted {
                return CloseReason::Failed(e);
            }
        }
    }

    loop {
        if state.is_shutting_down() {
            return CloseReason::Shutdown;
        }
        tokio::select! {
            biased;
            _ = shutdown.wait() => return CloseReason::Shutdown,
            step = contain(protocol.step(&mut *stream, &info)) => match step {
                Ok(Step::Continue) => {}
                Ok(Step::Finished) => return CloseReason::Finished,
                Err(e) => return CloseReason::Failed(e),
            },
        }
    }
}

/// Turns a panic inside a protocol future into a connection error.
async fn contain<T, F>(future: F) -> Result<T, ConnectionError>
where
    F: Future<Output = Result<T, ConnectionError>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(ConnectionError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

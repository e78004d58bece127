//! Signal handling for graceful server shutdown.
//!
//! The first termination signal requests shutdown through the shared server
//! state. The application listens again afterwards so that a second signal
//! can end the process without waiting for the drain.

use lobby_server::ServerState;
use tokio::signal;
use tracing::info;

/// Waits for a termination signal, then requests shutdown on `state`.
///
/// # Platform Support
///
/// * **Unix platforms**: Handles SIGINT and SIGTERM signals
/// * **Windows**: Handles Ctrl+C signal
pub async fn setup_signal_handlers(state: &ServerState) -> Result<(), Box<dyn std::error::Error>> {
    wait_for_signal().await?;
    info!("📡 Received shutdown signal - initiating graceful shutdown");
    state.request_shutdown();
    Ok(())
}

/// Resolves on the next termination signal without side effects.
pub async fn wait_for_signal() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => (),
            _ = sigterm.recv() => ()
        }
    }

    #[cfg(windows)]
    signal::ctrl_c().await?;

    Ok(())
}

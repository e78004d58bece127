//! Main application logic and lifecycle management.
//!
//! This module contains the `Application` struct that orchestrates server
//! startup, periodic statistics and graceful shutdown.

use crate::{
    config::AppConfig,
    logging::display_banner,
    signals::{setup_signal_handlers, wait_for_signal},
};
use lobby_server::{AcceptorExit, LobbyServer, ServerState, StateSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Owns the validated configuration and the bound server.
pub struct Application {
    /// Merged application configuration
    config: AppConfig,
    /// Bound lobby server, not yet accepting
    server: LobbyServer,
}

impl Application {
    /// Validates the configuration and binds the listener.
    ///
    /// `config` must already carry any command-line overrides. Binding
    /// happens here so that an occupied port is reported before the
    /// application claims to be running.
    pub async fn new(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        } else {
            info!("✅ Configuration loaded and validated successfully");
        }

        display_banner();

        let protocol = config.protocol()?;
        let server_config = config.to_server_config()?;
        let server = LobbyServer::bind(server_config).await?.with_protocol(protocol);

        Ok(Self { config, server })
    }

    /// Runs the server until a termination signal, then drains it.
    ///
    /// A failure of the accept loop is logged but does not end the process:
    /// admitted clients keep being served until the operator shuts down.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting Lobby Server Application");
        self.log_configuration_summary();

        let config = self.config;
        let mut handle = self.server.start();
        let state = handle.state().clone();

        let monitoring_handle = spawn_monitoring(state.clone(), config.server.stats_interval_secs);

        info!("✅ Lobby Server is now running!");
        if let Some(addr) = handle.local_addr() {
            info!("🎮 Ready to accept connections on {}", addr);
        }
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        tokio::select! {
            result = setup_signal_handlers(&state) => result?,
            exit = handle.acceptor_stopped() => {
                if exit != AcceptorExit::Shutdown {
                    error!(
                        "❌ Acceptor stopped ({:?}) - no new clients will be admitted",
                        exit
                    );
                }
                setup_signal_handlers(&state).await?;
            }
        }

        // merciless shutdown
        tokio::spawn(async move {
            if let Err(e) = wait_for_signal().await {
                error!("Failed to set up merciless shutdown signal handler: {e}");
                return;
            }

            warn!("Shutdown handler received again! I'll make this quick.");
            std::process::exit(1);
        });

        info!("🛑 Shutdown signal received, beginning graceful shutdown...");
        if let Some(monitoring_handle) = monitoring_handle {
            monitoring_handle.abort();
        }

        let report = handle.shutdown(config.drain_timeout()).await;
        if !report.drained {
            warn!(
                "⚠️ Exiting with {} connection(s) still open",
                report.remaining_connections
            );
        }

        log_final_statistics(&state.snapshot());

        info!("✅ Lobby Server shutdown complete");
        Ok(())
    }

    /// Logs the configuration summary at startup.
    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("  🌐 Bind address: {}", self.config.server.bind_address);
        info!("  👥 Max connections: {}", self.config.server.max_connections);
        info!(
            "  ⏱️ Backoff interval: {}ms",
            self.config.server.backoff_interval_ms
        );
        info!("  🧹 Drain timeout: {}s", self.config.server.drain_timeout_secs);
        info!("  💬 Protocol: {}", self.config.server.protocol);
    }
}

/// Spawns the periodic statistics reporter, unless `interval_secs` is 0.
fn spawn_monitoring(state: Arc<ServerState>, interval_secs: u64) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        return None;
    }
    info!("🔍 Health monitoring active - stats every {} seconds", interval_secs);

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        // The first tick completes immediately.
        interval.tick().await;

        loop {
            interval.tick().await;
            let snapshot = state.snapshot();
            info!(
                "📊 Lobby Health - {}/{} occupied | peak {} | {} admitted | {} released",
                snapshot.occupancy,
                snapshot.capacity,
                snapshot.peak_occupancy,
                snapshot.total_admitted,
                snapshot.total_released
            );

            if snapshot.occupancy == snapshot.capacity {
                info!("🔥 Lobby is full - new clients are waiting for a slot");
            }

            match serde_json::to_string(&snapshot) {
                Ok(json) => info!(target: "lobby::stats", "{}", json),
                Err(e) => warn!("Failed to serialize statistics: {}", e),
            }
        }
    }))
}

/// Logs final statistics during shutdown.
fn log_final_statistics(snapshot: &StateSnapshot) {
    info!("📊 Final Statistics:");
    info!("  - Total clients admitted: {}", snapshot.total_admitted);
    info!("  - Peak concurrent clients: {}", snapshot.peak_occupancy);
    info!("  - Connections still open: {}", snapshot.occupancy);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.server.bind_address = "127.0.0.1:0".to_string();
        config.server.max_connections = 2;
        config
    }

    #[tokio::test]
    async fn test_application_binds_configured_server() {
        let app = Application::new(local_config()).await.unwrap();

        assert_eq!(app.server.config().max_connections, 2);
        assert!(app.server.local_addr().unwrap().port() != 0);
        assert_eq!(app.server.state().capacity(), 2);
    }

    #[tokio::test]
    async fn test_application_rejects_invalid_config() {
        let mut config = local_config();
        config.server.max_connections = 0;

        let result = Application::new(config).await;
        let message = result.err().unwrap().to_string();
        assert!(message.contains("max_connections"));
    }

    #[tokio::test]
    async fn test_application_reports_occupied_port() {
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let mut config = local_config();
        config.server.bind_address = occupied.local_addr().unwrap().to_string();

        assert!(Application::new(config).await.is_err());
    }

    #[tokio::test]
    async fn test_monitoring_can_be_disabled() {
        let state = Arc::new(ServerState::new(1));
        assert!(spawn_monitoring(state.clone(), 0).is_none());

        let task = spawn_monitoring(state, 60).unwrap();
        task.abort();
    }
}

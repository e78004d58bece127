//! Utility functions and helper methods for the lobby server.
//!
//! This module provides convenient factory functions for binding server
//! instances with different configurations.

use crate::{config::ServerConfig, error::ServerError, server::LobbyServer};

/// Binds a new lobby server with default configuration.
///
/// # Example
///
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> Result<(), lobby_server::ServerError> {
/// use lobby_server::create_server;
///
/// let server = create_server().await?;
/// let handle = server.start();
/// # Ok(())
/// # }
/// ```
pub async fn create_server() -> Result<LobbyServer, ServerError> {
    LobbyServer::bind(ServerConfig::default()).await
}

/// Binds a new lobby server with custom configuration.
///
/// # Example
///
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> Result<(), lobby_server::ServerError> {
/// use lobby_server::{create_server_with_config, ServerConfig};
///
/// let config = ServerConfig {
///     bind_address: "0.0.0.0:25555".parse().unwrap(),
///     max_connections: 2,
///     ..Default::default()
/// };
///
/// let server = create_server_with_config(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn create_server_with_config(config: ServerConfig) -> Result<LobbyServer, ServerError> {
    LobbyServer::bind(config).await
}

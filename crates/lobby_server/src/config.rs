//! Server configuration types and defaults.
//!
//! This module contains the construction-time parameters of the lobby
//! server. Loading them from files or the command line is the host
//! application's job.

use crate::error::ServerError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Default listening port for the lobby.
pub const DEFAULT_PORT: u16 = 25555;

/// Delay between capacity re-checks while the server is full.
pub const DEFAULT_BACKOFF_INTERVAL_MS: u64 = 100;

/// Configuration structure for the lobby server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The socket address to bind the listener to
    pub bind_address: SocketAddr,

    /// Maximum number of concurrently admitted connections
    pub max_connections: usize,

    /// How long the acceptor sleeps between capacity checks when full
    pub backoff_interval_ms: u64,
}

impl ServerConfig {
    pub fn backoff_interval(&self) -> Duration {
        Duration::from_millis(self.backoff_interval_ms)
    }

    /// Rejects configurations that could never admit a client.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.max_connections == 0 {
            return Err(ServerError::Config(
                "max_connections must be greater than 0".to_string(),
            ));
        }
        if self.backoff_interval_ms == 0 {
            return Err(ServerError::Config(
                "backoff_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            max_connections: 8,
            backoff_interval_ms: DEFAULT_BACKOFF_INTERVAL_MS,
        }
    }
}

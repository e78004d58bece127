//! Configuration management for the lobby server.
//!
//! This module handles loading, validation, and conversion of server configuration
//! from TOML files and command-line arguments.

use crate::cli::CliArgs;
use lobby_server::{EchoProtocol, IdleProtocol, Protocol, ServerConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Protocols the binary knows how to serve.
pub const PROTOCOLS: [&str; 2] = ["idle", "echo"];

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration settings
    pub server: ServerSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Server-specific configuration settings.
///
/// Controls network binding, the admission limit and shutdown timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Network address to bind the server to (e.g., "127.0.0.1:25555")
    pub bind_address: String,
    /// Maximum number of concurrent client connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Delay between capacity checks while the lobby is full, in milliseconds
    #[serde(default = "default_backoff_interval_ms")]
    pub backoff_interval_ms: u64,
    /// How long to wait for connections to close on shutdown, in seconds
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
    /// Interval between statistics reports in seconds (0 to disable)
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,
    /// Protocol served to admitted clients ("idle" or "echo")
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

fn default_max_connections() -> usize {
    8
}

fn default_backoff_interval_ms() -> u64 {
    lobby_server::config::DEFAULT_BACKOFF_INTERVAL_MS
}

fn default_drain_timeout_secs() -> u64 {
    5
}

fn default_stats_interval_secs() -> u64 {
    60
}

fn default_protocol() -> String {
    "idle".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                bind_address: format!("127.0.0.1:{}", lobby_server::config::DEFAULT_PORT),
                max_connections: default_max_connections(),
                backoff_interval_ms: default_backoff_interval_ms(),
                drain_timeout_secs: default_drain_timeout_secs(),
                stats_interval_secs: default_stats_interval_secs(),
                protocol: default_protocol(),
            },
            logging: LoggingSettings::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the specified path
    /// and returns the default configuration.
    pub async fn load_from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Applies command-line overrides on top of the file settings.
    pub fn apply_overrides(&mut self, args: &CliArgs) {
        if let Some(bind_address) = &args.bind_address {
            self.server.bind_address = bind_address.clone();
        }
        if let Some(max_connections) = args.max_connections {
            self.server.max_connections = max_connections;
        }
        if let Some(protocol) = &args.protocol {
            self.server.protocol = protocol.clone();
        }
        if let Some(log_level) = &args.log_level {
            self.logging.level = log_level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
    }

    /// Converts the application configuration to a lobby server configuration.
    pub fn to_server_config(&self) -> Result<ServerConfig, Box<dyn std::error::Error>> {
        Ok(ServerConfig {
            bind_address: self.server.bind_address.parse()?,
            max_connections: self.server.max_connections,
            backoff_interval_ms: self.server.backoff_interval_ms,
        })
    }

    /// Builds the protocol named in the configuration.
    pub fn protocol(&self) -> Result<Arc<dyn Protocol>, String> {
        match self.server.protocol.as_str() {
            "idle" => Ok(Arc::new(IdleProtocol)),
            "echo" => Ok(Arc::new(EchoProtocol)),
            other => Err(format!(
                "Invalid protocol: {other}. Must be one of: {PROTOCOLS:?}"
            )),
        }
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.server.drain_timeout_secs)
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!(
                "Invalid bind address: {}",
                &self.server.bind_address
            ));
        }

        if self.server.max_connections == 0 {
            return Err("max_connections must be greater than 0".to_string());
        }

        if self.server.backoff_interval_ms == 0 {
            return Err("backoff_interval_ms must be greater than 0".to_string());
        }

        self.protocol()?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}

//! # Lobby Server - Main Entry Point
//!
//! Command-line host for the `lobby_server` admission core. This crate handles
//! CLI parsing, configuration loading, logging setup and the application
//! lifecycle from bind to drained shutdown.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration (port 25555, 8 clients)
//! lobby
//!
//! # Specify custom configuration
//! lobby --config production.toml
//!
//! # Override specific settings
//! lobby --bind 0.0.0.0:25555 --max-connections 32 --protocol echo --log-level debug
//!
//! # JSON logging for production
//! lobby --json-logs
//! ```
//!
//! ## Configuration
//!
//! The server loads configuration from a TOML file (default: `config.toml`).
//! If the file doesn't exist, a default configuration will be created.
//! Command-line options override values from the file.
//!
//! ## Signal Handling
//!
//! The first SIGINT or SIGTERM (Ctrl+C on Windows) starts a graceful
//! shutdown: the listener is closed, every client is disconnected and the
//! server waits up to `drain_timeout_secs` for their slots to be released.
//! A second signal exits immediately with status 1.

use tracing::error;

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod signals;

use app::Application;
use cli::CliArgs;

/// Runs the lobby server application.
///
/// # Exit Codes
///
/// * **0**: Successful execution and shutdown
/// * **1**: Error during startup, configuration, or runtime
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let mut config = match AppConfig::load_from_file(&args.config_path).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "❌ Failed to load configuration from {}: {e}",
                args.config_path.display()
            );
            std::process::exit(1);
        }
    };
    config.apply_overrides(&args);

    // Setup logging before anything else
    if let Err(e) = logging::setup_logging(&config.logging) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(config).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e}");
            std::process::exit(1);
        }
    }

    Ok(())
}

// Re-export main types for potential library usage
pub use config::{AppConfig, LoggingSettings, ServerSettings};

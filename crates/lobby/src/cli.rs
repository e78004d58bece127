//! Command-line interface handling for the lobby server.
//!
//! This module provides command-line argument parsing using the `clap` crate.
//! Every option except the config path overrides a config file setting.

use crate::config::PROTOCOLS;
use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for bind address
    pub bind_address: Option<String>,
    /// Optional override for the concurrent connection limit
    pub max_connections: Option<usize>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Optional override for the protocol served to clients
    pub protocol: Option<String>,
}

impl CliArgs {
    /// Parses the process arguments, exiting with usage on error.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    /// Parses an explicit argument list.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::from_matches(&command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("config.toml")),
            bind_address: matches.get_one::<String>("bind").cloned(),
            max_connections: matches.get_one::<usize>("max-connections").copied(),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            protocol: matches.get_one::<String>("protocol").cloned(),
        }
    }
}

fn command() -> Command {
    Command::new("Lobby Server")
        .version(env!("CARGO_PKG_VERSION"))
        .about("TCP lobby server that admits a bounded number of concurrent clients")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("bind")
                .short('b')
                .long("bind")
                .value_name("ADDRESS")
                .help("Bind address (e.g., 127.0.0.1:25555)"),
        )
        .arg(
            Arg::new("max-connections")
                .short('m')
                .long("max-connections")
                .value_name("COUNT")
                .help("Maximum number of concurrent clients")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("protocol")
                .long("protocol")
                .value_name("NAME")
                .help("Protocol served to admitted clients")
                .value_parser(PROTOCOLS),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::try_parse_from(["lobby"]).unwrap();

        assert_eq!(args.config_path, PathBuf::from("config.toml"));
        assert!(args.bind_address.is_none());
        assert!(args.max_connections.is_none());
        assert!(args.log_level.is_none());
        assert!(!args.json_logs);
        assert!(args.protocol.is_none());
    }

    #[test]
    fn test_all_overrides() {
        let args = CliArgs::try_parse_from([
            "lobby",
            "-c",
            "prod.toml",
            "--bind",
            "0.0.0.0:4000",
            "-m",
            "16",
            "--log-level",
            "debug",
            "--json-logs",
            "--protocol",
            "echo",
        ])
        .unwrap();

        assert_eq!(args.config_path, PathBuf::from("prod.toml"));
        assert_eq!(args.bind_address.as_deref(), Some("0.0.0.0:4000"));
        assert_eq!(args.max_connections, Some(16));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.json_logs);
        assert_eq!(args.protocol.as_deref(), Some("echo"));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(CliArgs::try_parse_from(["lobby", "-m", "lots"]).is_err());
        assert!(CliArgs::try_parse_from(["lobby", "--protocol", "telnet"]).is_err());
    }
}

//! Top-level configuration types.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

use super::blacklist::BlacklistConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Daemon configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Listener settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Filter settings.
    pub blacklist: BlacklistConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }
}

impl std::str::FromStr for Config {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(content)?)
    }
}

/// Listener configuration for the standalone daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the filtered HTTP listener binds to (default: 0.0.0.0:8080).
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Prometheus metrics HTTP port. Disabled when unset.
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            metrics_port: None,
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        [server]
        listen = "127.0.0.1:9000"
        metrics_port = 9090

        [blacklist]
        static_blacklist = ["127.0.0.1", "192.168.1.1"]
        real_ip_depth = 1
        db_path = "data/ipblacklist.db"

        [blacklist.dynamic]
        enabled = true
        period_seconds = 3
        rate_limit_threshold = 5
    "#;

    #[test]
    fn parses_full_config() {
        let config: Config = FULL.parse().unwrap();

        assert_eq!(config.server.listen, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.server.metrics_port, Some(9090));
        assert_eq!(config.blacklist.static_blacklist, ["127.0.0.1", "192.168.1.1"]);
        assert_eq!(config.blacklist.real_ip_depth, 1);
        assert_eq!(config.blacklist.db_path, "data/ipblacklist.db");
        assert!(config.blacklist.dynamic.enabled);
        assert_eq!(config.blacklist.dynamic.period_seconds, 3);
        assert_eq!(config.blacklist.dynamic.rate_limit_threshold, 5);
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config: Config = "[blacklist]\ndb_path = \"bl.db\"\n".parse().unwrap();

        assert_eq!(config.server.listen, default_listen());
        assert_eq!(config.server.metrics_port, None);
        assert!(config.blacklist.static_blacklist.is_empty());
        assert_eq!(config.blacklist.real_ip_depth, 0);
        assert!(!config.blacklist.dynamic.enabled);
        assert_eq!(config.blacklist.dynamic.period_seconds, 60);
        assert_eq!(config.blacklist.dynamic.rate_limit_threshold, 100);
    }

    #[test]
    fn missing_db_path_is_a_parse_error() {
        let err = "[blacklist]\nstatic_blacklist = []\n".parse::<Config>().unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load("/nonexistent/ipblacklist.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, FULL).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.blacklist.real_ip_depth, 1);
    }
}

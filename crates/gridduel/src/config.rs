//! Server configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use gridduel_match::MatchConfig;
use serde::{Deserialize, Serialize};

use crate::GridduelError;

/// Everything the server needs to start.
///
/// Every field has a default, so a config file only has to name what it
/// changes:
///
/// ```json
/// { "bind_addr": "0.0.0.0:4444", "match_config": { "read_timeout_secs": 60 } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the listener binds to.
    pub bind_addr: String,

    /// File the player records are loaded from and saved to.
    pub records_path: PathBuf,

    /// Log at `debug` instead of `info` (unless `RUST_LOG` is set).
    pub verbose: bool,

    /// How long running matches get to finish after shutdown is requested.
    pub shutdown_grace_secs: u64,

    /// Save all records after every concluded match, not just at shutdown.
    pub checkpoint_after_match: bool,

    /// Limits applied to every match.
    pub match_config: MatchConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:4444".to_string(),
            records_path: PathBuf::from("records.dat"),
            verbose: false,
            shutdown_grace_secs: 10,
            checkpoint_after_match: false,
            match_config: MatchConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parses a JSON config; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, GridduelError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON config file.
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, GridduelError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(GridduelError::ConfigIo)?;
        Self::from_json_str(&json)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:4444");
        assert!(!config.verbose);
        assert!(!config.checkpoint_after_match);
        assert_eq!(config.shutdown_grace(), Duration::from_secs(10));
        assert_eq!(config.match_config, MatchConfig::default());
    }

    #[test]
    fn test_server_config_partial_json_keeps_defaults() {
        let config = ServerConfig::from_json_str(
            r#"{ "records_path": "/tmp/players.dat",
                 "match_config": { "max_login_attempts": 3 } }"#,
        )
        .unwrap();
        assert_eq!(config.records_path, PathBuf::from("/tmp/players.dat"));
        assert_eq!(config.match_config.max_login_attempts, Some(3));
        assert_eq!(config.match_config.read_timeout_secs, None);
        assert_eq!(config.bind_addr, "127.0.0.1:4444");
    }

    #[test]
    fn test_server_config_bad_json() {
        let err = ServerConfig::from_json_str("{ bind_addr: 5 }").unwrap_err();
        assert!(matches!(err, GridduelError::ConfigParse(_)));
    }

    #[tokio::test]
    async fn test_server_config_missing_file() {
        let err = ServerConfig::from_json_file("/nonexistent/gridduel.json")
            .await
            .unwrap_err();
        assert!(matches!(err, GridduelError::ConfigIo(_)));
    }
}

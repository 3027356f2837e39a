//! Server configuration.

use std::path::Path;
use std::sync::Arc;

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::{DbError, KvStore, LedgerStore, SqliteStore};

/// Environment variable naming the SQLite database file.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
/// Environment variable naming the listen port.
pub const PORT_ENV: &str = "PORT";
/// Environment variable naming the listen host.
pub const HOST_ENV: &str = "HOST";

/// Which persistence backend to run on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Relational store in a SQLite file.
    #[default]
    Sqlite,
    /// Key-value store held in process memory; data is lost on exit.
    Memory,
}

/// Configuration for the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    port: u16,

    /// SQLite database file.
    #[serde(default = "default_db_path")]
    db_path: String,

    /// Persistence backend.
    #[serde(default)]
    backend: Backend,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "poker_tally.db".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            db_path: default_db_path(),
            backend: Backend::default(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file. Missing keys take their defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(host = %config.host, port = config.port, "Config loaded successfully");
        Ok(config)
    }

    /// Applies `DATABASE_URL`, `PORT` and `HOST` from the given lookup.
    #[instrument(skip(self, lookup))]
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db_path) = lookup(DATABASE_URL_ENV) {
            self.db_path = db_path;
        }
        if let Some(host) = lookup(HOST_ENV) {
            self.host = host;
        }
        if let Some(port) = lookup(PORT_ENV) {
            self.port = port.parse().map_err(|e| {
                ConfigError::new(format!("Invalid {} '{}': {}", PORT_ENV, port, e))
            })?;
        }
        Ok(self)
    }

    /// Applies command-line overrides; `None` keeps the current value.
    #[instrument(skip(self))]
    pub fn with_overrides(
        mut self,
        host: Option<String>,
        port: Option<u16>,
        db_path: Option<String>,
        backend: Option<Backend>,
    ) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(db_path) = db_path {
            self.db_path = db_path;
        }
        if let Some(backend) = backend {
            self.backend = backend;
        }
        self
    }

    /// Opens the configured store. Does not provision it.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the SQLite path is unusable.
    #[instrument(skip(self), fields(backend = ?self.backend))]
    pub fn open_store(&self) -> Result<Arc<dyn LedgerStore>, DbError> {
        Ok(match self.backend {
            Backend::Sqlite => Arc::new(SqliteStore::new(self.db_path.clone())?),
            Backend::Memory => Arc::new(KvStore::new()),
        })
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.host(), "127.0.0.1");
        assert_eq!(*config.port(), 3000);
        assert_eq!(config.db_path(), "poker_tally.db");
        assert_eq!(*config.backend(), Backend::Sqlite);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ServerConfig =
            toml::from_str("port = 8080\nbackend = \"memory\"\n").expect("parse");
        assert_eq!(*config.port(), 8080);
        assert_eq!(*config.backend(), Backend::Memory);
        assert_eq!(config.host(), "127.0.0.1");
    }

    #[test]
    fn test_flags_beat_env_beat_file() {
        let file: ServerConfig =
            toml::from_str("port = 4000\ndb_path = \"file.db\"\n").expect("parse");
        let config = file
            .with_env(env(&[("PORT", "5000"), ("DATABASE_URL", "env.db")]))
            .expect("env")
            .with_overrides(None, Some(6000), None, None);
        assert_eq!(*config.port(), 6000);
        assert_eq!(config.db_path(), "env.db");
    }

    #[test]
    fn test_invalid_port_env_rejected() {
        let result = ServerConfig::default().with_env(env(&[("PORT", "not-a-port")]));
        assert!(result.is_err());
    }
}

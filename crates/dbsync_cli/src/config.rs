//! Driver configuration file.
//!
//! The file is JSON: either one object, or an array whose first element is
//! used. Selectors are strings, `"0"` picking the first variant.
//!
//! ```json
//! [{
//!     "db_name": "inventory.db",
//!     "db_type": "0",
//!     "host_type": "1",
//!     "persistance": "0",
//!     "sql_statement": "CREATE TABLE files (path TEXT PRIMARY KEY, size INTEGER)"
//! }]
//! ```

use dbsync_core::{Config, DbEngineType, HostType};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading the driver configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not a valid configuration.
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),

    /// The file holds an empty array.
    #[error("config array is empty")]
    Empty,
}

/// One engine configuration as written in the file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DriverConfig {
    /// Database path, or `:memory:`.
    pub db_name: String,
    /// `"0"` selects SQLite 3.
    pub db_type: String,
    /// `"0"` selects the manager role.
    pub host_type: String,
    /// Accepted for compatibility; informational only.
    #[serde(default)]
    pub persistance: Option<String>,
    /// `CREATE TABLE` statement.
    pub sql_statement: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigFile {
    One(DriverConfig),
    Many(Vec<DriverConfig>),
}

impl DriverConfig {
    /// Parses configuration text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        match serde_json::from_str(text)? {
            ConfigFile::One(config) => Ok(config),
            ConfigFile::Many(configs) => configs.into_iter().next().ok_or(ConfigError::Empty),
        }
    }

    /// Reads and parses a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Host role selected by `host_type`.
    pub fn host(&self) -> HostType {
        if self.host_type == "0" {
            HostType::Manager
        } else {
            HostType::Agent
        }
    }

    /// Engine selected by `db_type`.
    pub fn engine(&self) -> DbEngineType {
        if self.db_type == "0" {
            DbEngineType::Sqlite3
        } else {
            DbEngineType::Undefined
        }
    }

    /// Builds the engine configuration.
    pub fn to_core(&self) -> Config {
        Config::new(self.host(), self.engine(), &self.db_name, &self.sql_statement)
    }
}

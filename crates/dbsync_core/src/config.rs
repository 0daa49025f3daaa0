//! Engine configuration.

use crate::types::{DbEngineType, HostType};
use std::time::Duration;

/// SQLite journal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JournalMode {
    /// Write-ahead logging.
    #[default]
    Wal,
    /// Rollback journal deleted at commit.
    Delete,
    /// Journal kept in memory.
    Memory,
}

impl JournalMode {
    /// Value for the `journal_mode` pragma.
    pub fn pragma_value(self) -> &'static str {
        match self {
            JournalMode::Wal => "WAL",
            JournalMode::Delete => "DELETE",
            JournalMode::Memory => "MEMORY",
        }
    }
}

/// Configuration for creating a synchronization context.
#[derive(Debug, Clone)]
pub struct Config {
    /// Role of this host.
    pub host_type: HostType,

    /// Backend engine.
    pub engine: DbEngineType,

    /// Database name; a file path, or `:memory:`.
    pub db_name: String,

    /// `CREATE TABLE` statement for the synchronized table.
    pub table_definition: String,

    /// How long a backend call waits on a locked database.
    pub busy_timeout: Duration,

    /// Journal mode for file databases.
    pub journal_mode: JournalMode,
}

impl Config {
    /// Creates a configuration with default backend tunables.
    #[must_use]
    pub fn new(
        host_type: HostType,
        engine: DbEngineType,
        db_name: impl Into<String>,
        table_definition: impl Into<String>,
    ) -> Self {
        Self {
            host_type,
            engine,
            db_name: db_name.into(),
            table_definition: table_definition.into(),
            busy_timeout: Duration::from_millis(5_000),
            journal_mode: JournalMode::default(),
        }
    }

    /// Sets the busy timeout.
    #[must_use]
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets the journal mode.
    #[must_use]
    pub fn with_journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = mode;
        self
    }

    /// Returns true if the database lives only in memory.
    pub fn is_in_memory(&self) -> bool {
        self.db_name == ":memory:"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::new(
            HostType::Agent,
            DbEngineType::Sqlite3,
            ":memory:",
            "CREATE TABLE t (a TEXT PRIMARY KEY)",
        );
        assert_eq!(config.busy_timeout, Duration::from_secs(5));
        assert_eq!(config.journal_mode, JournalMode::Wal);
        assert!(config.is_in_memory());
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new(HostType::Manager, DbEngineType::Sqlite3, "x.db", "")
            .with_busy_timeout(Duration::from_millis(10))
            .with_journal_mode(JournalMode::Delete);

        assert_eq!(config.busy_timeout, Duration::from_millis(10));
        assert_eq!(config.journal_mode.pragma_value(), "DELETE");
        assert!(!config.is_in_memory());
    }
}

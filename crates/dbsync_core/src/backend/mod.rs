//! Backend adapter.
//!
//! A backend is the relational engine a synchronization context reads from
//! and writes to. Callers only see the [`Backend`] and [`BackendTransaction`]
//! traits; the concrete engine is chosen once, from
//! [`Config::engine`](crate::Config), by [`open`].
//!
//! ## Contract
//!
//! - `ensure_table` creates the table if absent, or verifies that an existing
//!   table has the same columns and primary key
//! - `read_all` returns every persisted row ordered by primary key
//! - `transaction` starts a write transaction; dropping it without `commit`
//!   rolls every statement back

mod sqlite;

use crate::config::Config;
use crate::diff::ColumnChange;
use crate::error::{CoreError, CoreResult};
use crate::row::{Row, RowKey};
use crate::schema::Schema;
use crate::types::DbEngineType;

pub use sqlite::SqliteBackend;

/// A relational engine holding one synchronized table.
///
/// Implementations are owned by exactly one context and never shared, so
/// they only need to be `Send`.
pub trait Backend: Send {
    /// Engine implemented by this backend.
    fn engine(&self) -> DbEngineType;

    /// Creates the table if absent, or verifies compatibility if present.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Schema`] if the engine rejects the definition and
    /// [`CoreError::SchemaMismatch`] if an existing table differs.
    fn ensure_table(&mut self, schema: &Schema) -> CoreResult<()>;

    /// Reads all persisted rows, ordered by primary key ascending.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to read the table.
    fn read_all(&mut self, schema: &Schema) -> CoreResult<Vec<Row>>;

    /// Begins a write transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot start a transaction.
    fn transaction(&mut self) -> CoreResult<Box<dyn BackendTransaction + '_>>;
}

/// An open write transaction.
///
/// Dropping the transaction without calling [`commit`](Self::commit) rolls
/// back everything executed through it.
pub trait BackendTransaction {
    /// Inserts a full row.
    fn insert(&mut self, schema: &Schema, row: &Row) -> CoreResult<()>;

    /// Sets the given columns on the row identified by `key`.
    fn update(&mut self, schema: &Schema, key: &RowKey, columns: &[ColumnChange])
        -> CoreResult<()>;

    /// Deletes the row identified by `key`.
    fn delete(&mut self, schema: &Schema, key: &RowKey) -> CoreResult<()>;

    /// Commits all statements executed through this transaction.
    fn commit(self: Box<Self>) -> CoreResult<()>;
}

/// Opens the backend selected by `config.engine`.
///
/// # Errors
///
/// Returns [`CoreError::Open`] if the engine is unsupported or the database
/// cannot be opened or created.
pub fn open(config: &Config) -> CoreResult<Box<dyn Backend>> {
    match config.engine {
        DbEngineType::Sqlite3 => Ok(Box::new(SqliteBackend::open(config)?)),
        DbEngineType::Undefined => Err(CoreError::open(
            config.db_name.clone(),
            "no database engine selected",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HostType;

    #[test]
    fn undefined_engine_is_rejected() {
        let config = Config::new(HostType::Agent, DbEngineType::Undefined, ":memory:", "");
        let err = open(&config).err().unwrap();
        assert!(matches!(err, CoreError::Open { .. }));
    }

    #[test]
    fn sqlite_engine_opens() {
        let config = Config::new(HostType::Agent, DbEngineType::Sqlite3, ":memory:", "");
        let backend = open(&config).unwrap();
        assert_eq!(backend.engine(), DbEngineType::Sqlite3);
    }
}

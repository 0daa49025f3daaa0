//! SQLite backend.

use super::{Backend, BackendTransaction};
use crate::config::Config;
use crate::diff::ColumnChange;
use crate::error::{CoreError, CoreResult};
use crate::row::{Row, RowKey};
use crate::schema::Schema;
use crate::types::DbEngineType;
use crate::value::Value;
use rusqlite::{params_from_iter, Connection, OpenFlags, Transaction};
use tracing::debug;

/// A backend over one SQLite connection.
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Opens (creating if needed) the database named in `config`.
    ///
    /// `:memory:` opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Open`] if the file cannot be opened or created,
    /// or if the connection cannot be configured.
    pub fn open(config: &Config) -> CoreResult<Self> {
        let open_err = |e: rusqlite::Error| CoreError::open(config.db_name.clone(), e.to_string());

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&config.db_name, flags).map_err(open_err)?;

        conn.busy_timeout(config.busy_timeout).map_err(open_err)?;
        if !config.is_in_memory() {
            conn.execute_batch(&format!(
                "PRAGMA journal_mode = {};",
                config.journal_mode.pragma_value()
            ))
            .map_err(open_err)?;
        }

        debug!(db_name = %config.db_name, "opened sqlite backend");
        Ok(Self { conn })
    }

    fn table_exists(&self, table: &str) -> CoreResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn verify_table(&self, schema: &Schema) -> CoreResult<()> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote(schema.table())))?;
        // (name, position in primary key; 0 when not a key column)
        let existing = stmt
            .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, i64>(5)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let expected: Vec<&str> = schema.columns().iter().map(|c| c.name.as_str()).collect();
        let found: Vec<&str> = existing.iter().map(|(name, _)| name.as_str()).collect();
        let same_columns = expected.len() == found.len()
            && expected
                .iter()
                .zip(&found)
                .all(|(a, b)| a.eq_ignore_ascii_case(b));
        if !same_columns {
            return Err(CoreError::schema_mismatch(
                schema.table(),
                format!("expected columns {expected:?}, found {found:?}"),
            ));
        }

        let mut key_positions: Vec<(i64, usize)> = existing
            .iter()
            .enumerate()
            .filter(|(_, (_, pk))| *pk > 0)
            .map(|(index, (_, pk))| (*pk, index))
            .collect();
        key_positions.sort_unstable();
        let found_key: Vec<usize> = key_positions.into_iter().map(|(_, index)| index).collect();
        if found_key != schema.primary_key() {
            return Err(CoreError::schema_mismatch(
                schema.table(),
                "primary key differs from the table definition",
            ));
        }
        Ok(())
    }
}

impl Backend for SqliteBackend {
    fn engine(&self) -> DbEngineType {
        DbEngineType::Sqlite3
    }

    fn ensure_table(&mut self, schema: &Schema) -> CoreResult<()> {
        if self.table_exists(schema.table())? {
            return self.verify_table(schema);
        }
        self.conn
            .execute_batch(schema.definition())
            .map_err(|e| CoreError::schema(format!("backend rejected table definition: {e}")))?;
        debug!(table = schema.table(), "created table");
        Ok(())
    }

    fn read_all(&mut self, schema: &Schema) -> CoreResult<Vec<Row>> {
        let columns = column_list(schema.columns().iter().map(|c| c.name.as_str()));
        let order = column_list(schema.key_names());
        let sql = format!(
            "SELECT {columns} FROM {} ORDER BY {order}",
            quote(schema.table())
        );

        let width = schema.columns().len();
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(Value::from_sql))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Row::new)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn transaction(&mut self) -> CoreResult<Box<dyn BackendTransaction + '_>> {
        let tx = self.conn.transaction()?;
        Ok(Box::new(SqliteTransaction { tx }))
    }
}

struct SqliteTransaction<'conn> {
    tx: Transaction<'conn>,
}

impl SqliteTransaction<'_> {
    fn execute_one(&self, sql: &str, params: Vec<&Value>) -> CoreResult<()> {
        let mut stmt = self.tx.prepare_cached(sql)?;
        let affected = stmt.execute(params_from_iter(params))?;
        if affected != 1 {
            return Err(CoreError::apply(format!(
                "expected to change one row, changed {affected}"
            )));
        }
        Ok(())
    }
}

impl BackendTransaction for SqliteTransaction<'_> {
    fn insert(&mut self, schema: &Schema, row: &Row) -> CoreResult<()> {
        let columns = column_list(schema.columns().iter().map(|c| c.name.as_str()));
        let placeholders = (1..=schema.columns().len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({columns}) VALUES ({placeholders})",
            quote(schema.table())
        );
        self.execute_one(&sql, row.values().iter().collect())
    }

    fn update(
        &mut self,
        schema: &Schema,
        key: &RowKey,
        columns: &[ColumnChange],
    ) -> CoreResult<()> {
        let assignments = columns
            .iter()
            .enumerate()
            .map(|(i, change)| {
                format!("{} = ?{}", quote(&schema.columns()[change.column].name), i + 1)
            })
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments} WHERE {}",
            quote(schema.table()),
            key_predicate(schema, columns.len() + 1)
        );
        let params = columns
            .iter()
            .map(|change| &change.new)
            .chain(key.0.iter())
            .collect();
        self.execute_one(&sql, params)
    }

    fn delete(&mut self, schema: &Schema, key: &RowKey) -> CoreResult<()> {
        let sql = format!(
            "DELETE FROM {} WHERE {}",
            quote(schema.table()),
            key_predicate(schema, 1)
        );
        self.execute_one(&sql, key.0.iter().collect())
    }

    fn commit(self: Box<Self>) -> CoreResult<()> {
        self.tx.commit()?;
        Ok(())
    }
}

/// Quotes an identifier for SQLite.
fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn column_list<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.map(quote).collect::<Vec<_>>().join(", ")
}

/// `"k1" = ?n AND "k2" = ?n+1 ...`, numbering from `first_param`.
fn key_predicate(schema: &Schema, first_param: usize) -> String {
    schema
        .key_names()
        .enumerate()
        .map(|(i, name)| format!("{} = ?{}", quote(name), first_param + i))
        .collect::<Vec<_>>()
        .join(" AND ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HostType;

    const FILES: &str = "CREATE TABLE files (path TEXT PRIMARY KEY, size INTEGER, hash TEXT)";

    fn memory() -> SqliteBackend {
        let config = Config::new(HostType::Agent, DbEngineType::Sqlite3, ":memory:", FILES);
        SqliteBackend::open(&config).unwrap()
    }

    fn row(path: &str, size: i64) -> Row {
        Row::new(vec![Value::from(path), Value::Integer(size), Value::from("h")])
    }

    #[test]
    fn quoting() {
        assert_eq!(quote("a"), "\"a\"");
        assert_eq!(quote("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn creates_then_reads_empty_table() {
        let schema = Schema::parse(FILES).unwrap();
        let mut backend = memory();
        backend.ensure_table(&schema).unwrap();
        // Second call verifies the existing table.
        backend.ensure_table(&schema).unwrap();
        assert!(backend.read_all(&schema).unwrap().is_empty());
    }

    #[test]
    fn commit_and_read_back_in_key_order() {
        let schema = Schema::parse(FILES).unwrap();
        let mut backend = memory();
        backend.ensure_table(&schema).unwrap();

        let mut tx = backend.transaction().unwrap();
        tx.insert(&schema, &row("/b", 2)).unwrap();
        tx.insert(&schema, &row("/a", 1)).unwrap();
        tx.insert(&schema, &row("/c", 3)).unwrap();
        tx.update(
            &schema,
            &RowKey(vec![Value::from("/c")]),
            &[ColumnChange {
                column: 1,
                old: Value::Integer(3),
                new: Value::Integer(30),
            }],
        )
        .unwrap();
        tx.delete(&schema, &RowKey(vec![Value::from("/b")])).unwrap();
        tx.commit().unwrap();

        assert_eq!(
            backend.read_all(&schema).unwrap(),
            vec![row("/a", 1), row("/c", 30)]
        );
    }

    #[test]
    fn dropped_transaction_rolls_back() {
        let schema = Schema::parse(FILES).unwrap();
        let mut backend = memory();
        backend.ensure_table(&schema).unwrap();
        {
            let mut tx = backend.transaction().unwrap();
            tx.insert(&schema, &row("/a", 1)).unwrap();
        }
        assert!(backend.read_all(&schema).unwrap().is_empty());
    }

    #[test]
    fn delete_of_missing_row_fails() {
        let schema = Schema::parse(FILES).unwrap();
        let mut backend = memory();
        backend.ensure_table(&schema).unwrap();
        let mut tx = backend.transaction().unwrap();
        let err = tx
            .delete(&schema, &RowKey(vec![Value::from("/nope")]))
            .unwrap_err();
        assert!(matches!(err, CoreError::Apply { .. }));
    }

    #[test]
    fn existing_table_with_other_columns_is_rejected() {
        let mut backend = memory();
        backend
            .ensure_table(&Schema::parse("CREATE TABLE files (path TEXT PRIMARY KEY, mtime INTEGER)").unwrap())
            .unwrap();
        let err = backend
            .ensure_table(&Schema::parse(FILES).unwrap())
            .unwrap_err();
        assert!(matches!(err, CoreError::SchemaMismatch { .. }));
    }

    #[test]
    fn existing_table_with_other_key_is_rejected() {
        let mut backend = memory();
        backend
            .ensure_table(
                &Schema::parse("CREATE TABLE files (path TEXT, size INTEGER PRIMARY KEY, hash TEXT)")
                    .unwrap(),
            )
            .unwrap();
        let err = backend
            .ensure_table(&Schema::parse(FILES).unwrap())
            .unwrap_err();
        assert!(matches!(err, CoreError::SchemaMismatch { .. }));
    }

    #[test]
    fn unopenable_path() {
        let config = Config::new(
            HostType::Agent,
            DbEngineType::Sqlite3,
            "/nonexistent-dir/for/sure/db.sqlite",
            FILES,
        );
        assert!(matches!(
            SqliteBackend::open(&config).err().unwrap(),
            CoreError::Open { .. }
        ));
    }
}

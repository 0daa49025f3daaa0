//! Test fixtures and table helpers.
//!
//! Each fixture owns a private [`HandleRegistry`], so tests never share
//! handles through the process-wide registry.

use dbsync_core::{
    Config, CoreResult, DbEngineType, DiffResult, HandleRegistry, HostType, Row, StatsSnapshot,
    SyncHandle,
};
use std::path::PathBuf;
use tempfile::TempDir;

/// Table used by most tests: keyed by `path`.
pub const FILES_TABLE: &str =
    "CREATE TABLE files (path TEXT PRIMARY KEY, size INTEGER, hash TEXT)";

/// Table with a two-column primary key.
pub const PORTS_TABLE: &str = "CREATE TABLE ports (protocol TEXT, local_port INTEGER, \
     pid INTEGER, process TEXT, PRIMARY KEY (protocol, local_port))";

/// A synchronized test table with automatic cleanup.
pub struct TestTable {
    registry: HandleRegistry,
    handle: SyncHandle,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
    path: Option<PathBuf>,
}

impl TestTable {
    /// Creates an in-memory `files` table.
    pub fn memory() -> Self {
        Self::memory_with(FILES_TABLE)
    }

    /// Creates an in-memory table from a definition.
    pub fn memory_with(definition: &str) -> Self {
        let registry = HandleRegistry::new();
        let config = Config::new(HostType::Agent, DbEngineType::Sqlite3, ":memory:", definition);
        let handle = registry
            .initialize(&config)
            .expect("Failed to initialize in-memory table");
        Self {
            registry,
            handle,
            _temp_dir: None,
            path: None,
        }
    }

    /// Creates a file-backed `files` table in a temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("sync.db");
        let registry = HandleRegistry::new();
        let config = Config::new(
            HostType::Manager,
            DbEngineType::Sqlite3,
            path.to_str().expect("temp path is UTF-8"),
            FILES_TABLE,
        );
        let handle = registry
            .initialize(&config)
            .expect("Failed to initialize file table");
        Self {
            registry,
            handle,
            _temp_dir: Some(temp_dir),
            path: Some(path),
        }
    }

    /// Returns the database path if file-based, None if in-memory.
    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// The table's handle.
    pub fn handle(&self) -> SyncHandle {
        self.handle
    }

    /// The registry owning the handle.
    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    /// Applies a snapshot.
    pub fn update(&self, snapshot: &serde_json::Value) -> CoreResult<DiffResult> {
        self.registry.update_with_snapshot(self.handle, snapshot)
    }

    /// Reads back every persisted row in key order.
    pub fn rows(&self) -> Vec<Row> {
        self.registry
            .select_all(self.handle)
            .expect("Failed to read table")
    }

    /// The handle's counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.registry
            .stats(self.handle)
            .expect("Failed to read stats")
    }
}

impl Drop for TestTable {
    fn drop(&mut self) {
        self.registry.teardown_all();
    }
}

/// Runs a test with a temporary in-memory `files` table.
pub fn with_temp_table<F, R>(f: F) -> R
where
    F: FnOnce(&TestTable) -> R,
{
    let table = TestTable::memory();
    f(&table)
}

/// Runs a test with a temporary file-backed `files` table.
pub fn with_file_table<F, R>(f: F) -> R
where
    F: FnOnce(&TestTable) -> R,
{
    let table = TestTable::file();
    f(&table)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use serde_json::json;

    /// Snapshot of `count` rows `/file/<i>` with `size = i`.
    pub fn files_snapshot(count: usize) -> serde_json::Value {
        serde_json::Value::Array(
            (0..count)
                .map(|i| json!({"path": format!("/file/{i}"), "size": i, "hash": format!("h{i}")}))
                .collect(),
        )
    }

    /// Creates a `files` table already holding `count` rows.
    pub fn populated_table(count: usize) -> TestTable {
        let table = TestTable::memory();
        table
            .update(&files_snapshot(count))
            .expect("Failed to populate table");
        table
    }
}

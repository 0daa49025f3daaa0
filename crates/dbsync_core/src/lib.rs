//! # dbsync core
//!
//! Snapshot synchronization engine.
//!
//! A caller registers a table definition and receives an opaque handle.
//! Each update submits the complete current state of the table as a
//! snapshot; the engine diffs it against the persisted rows, applies the
//! inserts, modifies and deletes in one transaction, and hands back a
//! [`DiffResult`] describing what changed.
//!
//! This crate provides:
//! - Schema parsing of `CREATE TABLE` statements
//! - A backend abstraction with an SQLite implementation
//! - The snapshot differ and the atomic executor
//! - A process-wide handle registry with per-handle locking

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod config;
mod context;
mod diff;
mod error;
mod executor;
mod registry;
mod result;
mod row;
mod schema;
mod snapshot;
mod stats;
mod types;
mod value;

pub use backend::{open as open_backend, Backend, BackendTransaction, SqliteBackend};
pub use config::{Config, JournalMode};
pub use diff::{diff, Change, ChangeKind, ColumnChange};
pub use error::{CoreError, CoreResult, ErrorKind};
pub use executor::apply;
pub use registry::{
    free_result, global, initialize, initialize_with_config, select_all, stats, teardown,
    teardown_all, update_with_snapshot, HandleRegistry,
};
pub use result::{build as build_result, ColumnDiff, DiffEntry, DiffResult};
pub use row::{Fields, Row, RowKey};
pub use schema::{Column, Schema};
pub use snapshot::Snapshot;
pub use stats::{StatsSnapshot, SyncStats};
pub use types::{DbEngineType, HostType, SyncHandle};
pub use value::{Affinity, Value};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

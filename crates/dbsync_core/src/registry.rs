//! Handle registry and the public operations.
//!
//! A [`HandleRegistry`] maps opaque handles to synchronization contexts.
//! The registry's own lock only covers insert, lookup and removal; every
//! operation on a context runs under that context's guard, so callers on
//! different handles never wait on each other.
//!
//! The free functions in this module operate on one process-wide registry,
//! empty at start-up and drained by [`teardown_all`].
//!
//! # Example
//!
//! ```rust,ignore
//! use dbsync_core::{DbEngineType, HostType};
//! use serde_json::json;
//!
//! let handle = dbsync_core::initialize(
//!     HostType::Agent,
//!     DbEngineType::Sqlite3,
//!     ":memory:",
//!     "CREATE TABLE files (path TEXT PRIMARY KEY, size INTEGER, hash TEXT)",
//! );
//! let result = dbsync_core::update_with_snapshot(handle, &json!([{"path": "/a", "size": 1}]))?;
//! assert_eq!(result.inserted(), 1);
//! dbsync_core::free_result(result);
//! dbsync_core::teardown(handle)?;
//! ```

use crate::config::Config;
use crate::context::SyncContext;
use crate::error::{CoreError, CoreResult};
use crate::result::DiffResult;
use crate::row::Row;
use crate::stats::StatsSnapshot;
use crate::types::{DbEngineType, HostType, SyncHandle};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Maps handles to live synchronization contexts.
pub struct HandleRegistry {
    contexts: RwLock<BTreeMap<u64, Arc<SyncContext>>>,
    next_handle: AtomicU64,
}

impl HandleRegistry {
    /// Creates an empty registry.
    pub const fn new() -> Self {
        Self {
            contexts: parking_lot::const_rwlock(BTreeMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Creates a context from `config` and registers it.
    ///
    /// Nothing is registered unless every step succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Schema`] or [`CoreError::SchemaMismatch`] for an
    /// unusable table definition and [`CoreError::Open`] if the backend
    /// cannot be opened.
    pub fn initialize(&self, config: &Config) -> CoreResult<SyncHandle> {
        let handle = SyncHandle::new(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let context = SyncContext::open(handle, config).map_err(|e| {
            warn!(
                host_type = %config.host_type,
                engine = %config.engine,
                db_name = %config.db_name,
                error = %e,
                "initialize failed"
            );
            e
        })?;

        info!(
            %handle,
            host_type = %config.host_type,
            engine = %config.engine,
            table = context.schema().table(),
            "initialized"
        );
        self.contexts.write().insert(handle.as_u64(), Arc::new(context));
        Ok(handle)
    }

    fn context(&self, handle: SyncHandle) -> CoreResult<Arc<SyncContext>> {
        self.contexts
            .read()
            .get(&handle.as_u64())
            .cloned()
            .ok_or(CoreError::InvalidHandle(handle.as_u64()))
    }

    /// Synchronizes the handle's table with `snapshot`.
    ///
    /// Blocks while another operation on the same handle is in progress.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidHandle`] for an unknown or torn-down
    /// handle, [`CoreError::Parse`] for a malformed snapshot and
    /// [`CoreError::Apply`] if the backend fails. On error the persisted
    /// table is unchanged.
    pub fn update_with_snapshot(
        &self,
        handle: SyncHandle,
        snapshot: &serde_json::Value,
    ) -> CoreResult<DiffResult> {
        self.context(handle)?.update(snapshot)
    }

    /// Returns every persisted row of the handle's table, in key order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidHandle`] for an unknown handle, or a
    /// backend error if the read fails.
    pub fn select_all(&self, handle: SyncHandle) -> CoreResult<Vec<Row>> {
        self.context(handle)?.select_all()
    }

    /// Returns the handle's counters.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidHandle`] for an unknown handle.
    pub fn stats(&self, handle: SyncHandle) -> CoreResult<StatsSnapshot> {
        Ok(self.context(handle)?.stats())
    }

    /// Invalidates the handle and releases its backend.
    ///
    /// Waits for an in-flight operation on the handle to finish.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidHandle`] if the handle is unknown.
    pub fn teardown(&self, handle: SyncHandle) -> CoreResult<()> {
        let context = self
            .contexts
            .write()
            .remove(&handle.as_u64())
            .ok_or(CoreError::InvalidHandle(handle.as_u64()))?;
        close(handle, &context);
        Ok(())
    }

    /// Tears down every registered handle, returning how many there were.
    pub fn teardown_all(&self) -> usize {
        let drained = std::mem::take(&mut *self.contexts.write());
        for (raw, context) in &drained {
            close(SyncHandle::new(*raw), context);
        }
        drained.len()
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.contexts.read().len()
    }

    /// Returns true if no handle is live.
    pub fn is_empty(&self) -> bool {
        self.contexts.read().is_empty()
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn close(handle: SyncHandle, context: &SyncContext) {
    if let Some(engine) = context.close() {
        info!(
            %handle,
            host_type = %context.host_type(),
            %engine,
            table = context.schema().table(),
            "torn down"
        );
    }
}

static REGISTRY: HandleRegistry = HandleRegistry::new();

/// Returns the process-wide registry.
pub fn global() -> &'static HandleRegistry {
    &REGISTRY
}

/// Creates a synchronization context with default tunables.
///
/// Returns [`SyncHandle::NONE`] if the table definition is unusable or the
/// backend cannot be opened; the cause is logged. Use
/// [`initialize_with_config`] to receive the error instead.
pub fn initialize(
    host_type: HostType,
    engine: DbEngineType,
    db_name: &str,
    table_definition: &str,
) -> SyncHandle {
    let config = Config::new(host_type, engine, db_name, table_definition);
    REGISTRY.initialize(&config).unwrap_or(SyncHandle::NONE)
}

/// Creates a synchronization context from a full configuration.
///
/// # Errors
///
/// See [`HandleRegistry::initialize`].
pub fn initialize_with_config(config: &Config) -> CoreResult<SyncHandle> {
    REGISTRY.initialize(config)
}

/// Synchronizes a table with a snapshot. See
/// [`HandleRegistry::update_with_snapshot`].
///
/// # Errors
///
/// See [`HandleRegistry::update_with_snapshot`].
pub fn update_with_snapshot(
    handle: SyncHandle,
    snapshot: &serde_json::Value,
) -> CoreResult<DiffResult> {
    REGISTRY.update_with_snapshot(handle, snapshot)
}

/// Releases a diff result.
///
/// Consuming the result makes a second release impossible.
pub fn free_result(result: DiffResult) {
    debug!(table = result.table(), entries = result.len(), "released diff result");
    drop(result);
}

/// Invalidates a handle. See [`HandleRegistry::teardown`].
///
/// # Errors
///
/// Returns [`CoreError::InvalidHandle`] if the handle is unknown.
pub fn teardown(handle: SyncHandle) -> CoreResult<()> {
    REGISTRY.teardown(handle)
}

/// Tears down every handle in the process.
pub fn teardown_all() -> usize {
    REGISTRY.teardown_all()
}

/// Returns a handle's counters.
///
/// # Errors
///
/// Returns [`CoreError::InvalidHandle`] if the handle is unknown.
pub fn stats(handle: SyncHandle) -> CoreResult<StatsSnapshot> {
    REGISTRY.stats(handle)
}

/// Reads back every persisted row of a handle's table.
///
/// # Errors
///
/// See [`HandleRegistry::select_all`].
pub fn select_all(handle: SyncHandle) -> CoreResult<Vec<Row>> {
    REGISTRY.select_all(handle)
}

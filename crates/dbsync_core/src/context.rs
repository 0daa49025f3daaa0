//! Synchronization context and its concurrency guard.

use crate::backend::{self, Backend};
use crate::config::Config;
use crate::diff::diff;
use crate::error::{CoreError, CoreResult};
use crate::executor;
use crate::result::{self, DiffResult};
use crate::row::Row;
use crate::schema::Schema;
use crate::snapshot::Snapshot;
use crate::stats::{StatsSnapshot, SyncStats};
use crate::types::{DbEngineType, HostType, SyncHandle};
use parking_lot::Mutex;
use tracing::{debug, warn};

/// One synchronized table: its schema, its backend connection and the
/// guard serializing every operation on it.
///
/// The backend slot is emptied by [`close`](Self::close). Callers that were
/// blocked on the guard while the context was closed observe an empty slot
/// and fail with [`CoreError::InvalidHandle`].
pub(crate) struct SyncContext {
    handle: SyncHandle,
    host_type: HostType,
    schema: Schema,
    backend: Mutex<Option<Box<dyn Backend>>>,
    stats: SyncStats,
}

impl SyncContext {
    /// Parses the schema, opens the backend and ensures the table exists.
    pub(crate) fn open(handle: SyncHandle, config: &Config) -> CoreResult<Self> {
        let schema = Schema::parse(&config.table_definition)?;
        let mut backend = backend::open(config)?;
        backend.ensure_table(&schema)?;
        Ok(Self {
            handle,
            host_type: config.host_type,
            schema,
            backend: Mutex::new(Some(backend)),
            stats: SyncStats::new(),
        })
    }

    pub(crate) fn host_type(&self) -> HostType {
        self.host_type
    }

    pub(crate) fn schema(&self) -> &Schema {
        &self.schema
    }

    pub(crate) fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Runs the decode, read, diff, apply and build pipeline under the guard.
    pub(crate) fn update(&self, payload: &serde_json::Value) -> CoreResult<DiffResult> {
        let mut slot = self.backend.lock();
        let backend = slot
            .as_deref_mut()
            .ok_or(CoreError::InvalidHandle(self.handle.as_u64()))?;

        match self.run_update(backend, payload) {
            Ok(result) => {
                self.stats
                    .record_update(result.inserted(), result.modified(), result.deleted());
                Ok(result)
            }
            Err(e) => {
                self.stats.record_failure();
                warn!(
                    handle = %self.handle,
                    host_type = %self.host_type,
                    table = self.schema.table(),
                    error = %e,
                    "update rejected"
                );
                Err(e)
            }
        }
    }

    fn run_update(
        &self,
        backend: &mut dyn Backend,
        payload: &serde_json::Value,
    ) -> CoreResult<DiffResult> {
        let snapshot = Snapshot::decode(&self.schema, payload)?;
        let persisted = backend.read_all(&self.schema)?;
        let changes = diff(&self.schema, &persisted, &snapshot)?;
        debug!(
            handle = %self.handle,
            snapshot_rows = snapshot.len(),
            persisted_rows = persisted.len(),
            changes = changes.len(),
            "computed diff"
        );
        let result = result::build(&self.schema, &changes)?;
        executor::apply(backend, &self.schema, &changes)?;
        Ok(result)
    }

    /// Reads every persisted row under the guard.
    pub(crate) fn select_all(&self) -> CoreResult<Vec<Row>> {
        let mut slot = self.backend.lock();
        let backend = slot
            .as_deref_mut()
            .ok_or(CoreError::InvalidHandle(self.handle.as_u64()))?;
        backend.read_all(&self.schema)
    }

    /// Waits for any in-flight operation, then releases the backend.
    pub(crate) fn close(&self) -> Option<DbEngineType> {
        self.backend.lock().take().map(|backend| backend.engine())
    }
}

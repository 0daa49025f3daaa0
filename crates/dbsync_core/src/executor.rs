//! Transaction executor.
//!
//! Applies a change set inside a single backend transaction. Either every
//! change commits or none does: on the first failing statement the
//! transaction is dropped, which rolls it back.

use crate::backend::Backend;
use crate::diff::{Change, ChangeKind};
use crate::error::{CoreError, CoreResult};
use crate::schema::Schema;
use tracing::{debug, warn};

/// Applies `changes` atomically.
///
/// Deletes execute before inserts and modifies; the order of `changes`
/// is otherwise preserved. An empty change set is a no-op and opens no transaction.
///
/// # Errors
///
/// Returns [`CoreError::Apply`] if any statement or the commit fails. The
/// persisted table is then unchanged.
pub fn apply(backend: &mut dyn Backend, schema: &Schema, changes: &[Change]) -> CoreResult<()> {
    if changes.is_empty() {
        return Ok(());
    }

    // Deletes run first so a row taking over a unique value from a removed
    // row does not collide with it.
    let deletes = changes.iter().filter(|c| c.kind() == ChangeKind::Delete);
    let upserts = changes.iter().filter(|c| c.kind() != ChangeKind::Delete);

    let mut tx = backend.transaction().map_err(into_apply)?;
    for (index, change) in deletes.chain(upserts).enumerate() {
        let result = match change {
            Change::Insert { row } => tx.insert(schema, row),
            Change::Modify { key, columns } => tx.update(schema, key, columns),
            Change::Delete { row } => tx.delete(schema, &row.key(schema)),
        };
        if let Err(e) = result {
            warn!(
                table = schema.table(),
                statement = index,
                error = %e,
                "statement failed, rolling back"
            );
            return Err(into_apply(e));
        }
    }
    tx.commit().map_err(into_apply)?;

    debug!(table = schema.table(), statements = changes.len(), "committed");
    Ok(())
}

fn into_apply(err: CoreError) -> CoreError {
    match err {
        CoreError::Apply { .. } => err,
        other => CoreError::apply(other.to_string()),
    }
}

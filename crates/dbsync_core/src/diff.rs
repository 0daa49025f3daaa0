//! Snapshot differ.
//!
//! Compares the persisted rows of a table against a snapshot, keyed by
//! primary key, and produces the change set that makes the table equal to
//! the snapshot.
//!
//! ## Ordering
//!
//! Inserts and modifies come first, in snapshot order. Deletes follow in
//! increasing primary-key order. The output depends only on the inputs, so
//! identical inputs always yield identical change sets.

use crate::error::CoreResult;
use crate::row::{Row, RowKey};
use crate::schema::Schema;
use crate::snapshot::Snapshot;
use crate::value::Value;
use std::collections::BTreeMap;

/// Kind of a row-level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// The row exists only in the snapshot.
    Insert,
    /// The row exists on both sides with differing non-key columns.
    Modify,
    /// The row exists only in persisted state.
    Delete,
}

/// A changed non-key column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnChange {
    /// Column index in the schema.
    pub column: usize,
    /// Persisted value.
    pub old: Value,
    /// Snapshot value.
    pub new: Value,
}

/// One row-level change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Insert the full snapshot row.
    Insert {
        /// The new row.
        row: Row,
    },
    /// Update the changed columns of an existing row.
    Modify {
        /// Primary key of the row.
        key: RowKey,
        /// Only the columns whose value differs.
        columns: Vec<ColumnChange>,
    },
    /// Delete a persisted row.
    Delete {
        /// The row as last persisted.
        row: Row,
    },
}

impl Change {
    /// Returns the kind of change.
    pub fn kind(&self) -> ChangeKind {
        match self {
            Change::Insert { .. } => ChangeKind::Insert,
            Change::Modify { .. } => ChangeKind::Modify,
            Change::Delete { .. } => ChangeKind::Delete,
        }
    }

    /// Primary key of the affected row.
    pub fn key(&self, schema: &Schema) -> RowKey {
        match self {
            Change::Insert { row } | Change::Delete { row } => row.key(schema),
            Change::Modify { key, .. } => key.clone(),
        }
    }
}

/// Computes the change set turning `persisted` into `snapshot`.
///
/// `persisted` may be in any order but must not repeat a primary key,
/// which the backend's key constraint guarantees.
///
/// # Errors
///
/// Returns [`crate::CoreError::Allocation`] if the change set cannot be
/// allocated.
pub fn diff(schema: &Schema, persisted: &[Row], snapshot: &Snapshot) -> CoreResult<Vec<Change>> {
    let mut unvisited: BTreeMap<RowKey, &Row> =
        persisted.iter().map(|row| (row.key(schema), row)).collect();

    let mut changes = Vec::new();
    changes.try_reserve(snapshot.len())?;

    for row in snapshot.rows() {
        let key = row.key(schema);
        match unvisited.remove(&key) {
            None => changes.push(Change::Insert { row: row.clone() }),
            Some(old) => {
                let columns = changed_columns(schema, old, row);
                if !columns.is_empty() {
                    changes.push(Change::Modify { key, columns });
                }
            }
        }
    }

    changes.try_reserve(unvisited.len())?;
    changes.extend(
        unvisited
            .into_values()
            .map(|row| Change::Delete { row: row.clone() }),
    );

    Ok(changes)
}

fn changed_columns(schema: &Schema, old: &Row, new: &Row) -> Vec<ColumnChange> {
    old.values()
        .iter()
        .zip(new.values())
        .enumerate()
        .filter(|(index, (o, n))| !schema.is_key_column(*index) && o != n)
        .map(|(column, (o, n))| ColumnChange {
            column,
            old: o.clone(),
            new: n.clone(),
        })
        .collect()
}

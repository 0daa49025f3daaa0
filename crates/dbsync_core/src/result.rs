//! Result builder.
//!
//! Turns an applied change set into a [`DiffResult`]: an owned, immutable
//! value handed to the caller. Column maps are named and ordered by the
//! table definition so the JSON rendering is stable.

use crate::diff::{Change, ChangeKind};
use crate::error::CoreResult;
use crate::row::Fields;
use crate::schema::Schema;
use crate::value::Value;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Old and new value of a changed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDiff {
    /// Persisted value before the update.
    pub old: Value,
    /// Value after the update.
    pub new: Value,
}

/// One entry of a diff result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DiffEntry {
    /// A row that was inserted.
    Insert {
        /// Primary-key values.
        key: Fields,
        /// Every column of the new row.
        values: Fields,
    },
    /// A row whose non-key columns changed.
    Modify {
        /// Primary-key values.
        key: Fields,
        /// Changed columns only.
        #[serde(serialize_with = "serialize_changes")]
        changes: Vec<(String, ColumnDiff)>,
    },
    /// A row that was deleted.
    Delete {
        /// Primary-key values.
        key: Fields,
        /// The row as last persisted.
        values: Fields,
    },
}

impl DiffEntry {
    /// Returns the kind of entry.
    pub fn kind(&self) -> ChangeKind {
        match self {
            DiffEntry::Insert { .. } => ChangeKind::Insert,
            DiffEntry::Modify { .. } => ChangeKind::Modify,
            DiffEntry::Delete { .. } => ChangeKind::Delete,
        }
    }

    /// Primary-key values of the affected row.
    pub fn key(&self) -> &Fields {
        match self {
            DiffEntry::Insert { key, .. }
            | DiffEntry::Modify { key, .. }
            | DiffEntry::Delete { key, .. } => key,
        }
    }
}

fn serialize_changes<S: Serializer>(
    changes: &[(String, ColumnDiff)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(changes.len()))?;
    for (name, change) in changes {
        map.serialize_entry(name, change)?;
    }
    map.end()
}

/// The outcome of one successful update.
///
/// Owned by the caller. It holds no reference into the engine, so later
/// updates on the same handle cannot alter it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    table: String,
    inserted: usize,
    modified: usize,
    deleted: usize,
    entries: Vec<DiffEntry>,
}

impl DiffResult {
    /// Table the diff applies to.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Entries in application order.
    pub fn entries(&self) -> &[DiffEntry] {
        &self.entries
    }

    /// Number of insert entries.
    pub fn inserted(&self) -> usize {
        self.inserted
    }

    /// Number of modify entries.
    pub fn modified(&self) -> usize {
        self.modified
    }

    /// Number of delete entries.
    pub fn deleted(&self) -> usize {
        self.deleted
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the update changed nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the result as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        // Every map key is a string and every float is finite or null.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Builds the caller-facing result for an applied change set.
///
/// # Errors
///
/// Returns [`crate::CoreError::Allocation`] if the entry list cannot be
/// allocated.
pub fn build(schema: &Schema, changes: &[Change]) -> CoreResult<DiffResult> {
    let mut entries = Vec::new();
    entries.try_reserve_exact(changes.len())?;

    let (mut inserted, mut modified, mut deleted) = (0, 0, 0);
    for change in changes {
        let entry = match change {
            Change::Insert { row } => {
                inserted += 1;
                DiffEntry::Insert {
                    key: row.key(schema).to_fields(schema),
                    values: row.to_fields(schema),
                }
            }
            Change::Modify { key, columns } => {
                modified += 1;
                DiffEntry::Modify {
                    key: key.to_fields(schema),
                    changes: columns
                        .iter()
                        .map(|c| {
                            (
                                schema.columns()[c.column].name.clone(),
                                ColumnDiff {
                                    old: c.old.clone(),
                                    new: c.new.clone(),
                                },
                            )
                        })
                        .collect(),
                }
            }
            Change::Delete { row } => {
                deleted += 1;
                DiffEntry::Delete {
                    key: row.key(schema).to_fields(schema),
                    values: row.to_fields(schema),
                }
            }
        };
        entries.push(entry);
    }

    Ok(DiffResult {
        table: schema.table().to_owned(),
        inserted,
        modified,
        deleted,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::ColumnChange;
    use crate::row::{Row, RowKey};
    use serde_json::json;

    fn schema() -> Schema {
        Schema::parse("CREATE TABLE files (path TEXT PRIMARY KEY, size INTEGER, hash TEXT)")
            .unwrap()
    }

    #[test]
    fn renders_every_entry_kind() {
        let schema = schema();
        let changes = vec![
            Change::Insert {
                row: Row::new(vec![Value::from("/a"), Value::Integer(1), Value::from("x")]),
            },
            Change::Modify {
                key: RowKey(vec![Value::from("/b")]),
                columns: vec![ColumnChange {
                    column: 1,
                    old: Value::Integer(1),
                    new: Value::Integer(2),
                }],
            },
            Change::Delete {
                row: Row::new(vec![Value::from("/c"), Value::Integer(3), Value::from("z")]),
            },
        ];

        let result = build(&schema, &changes).unwrap();
        assert_eq!(
            (result.inserted(), result.modified(), result.deleted()),
            (1, 1, 1)
        );
        assert_eq!(result.len(), 3);
        assert_eq!(
            result.to_json(),
            json!({
                "table": "files",
                "inserted": 1, "modified": 1, "deleted": 1,
                "entries": [
                    {"kind": "insert", "key": {"path": "/a"}, "values": {"path": "/a", "size": 1, "hash": "x"}},
                    {"kind": "modify", "key": {"path": "/b"}, "changes": {"size": {"old": 1, "new": 2}}},
                    {"kind": "delete", "key": {"path": "/c"}, "values": {"path": "/c", "size": 3, "hash": "z"}}
                ]
            })
        );
    }

    #[test]
    fn column_order_follows_definition() {
        let schema = schema();
        let result = build(
            &schema,
            &[Change::Insert {
                row: Row::new(vec![Value::from("/a"), Value::Null, Value::from("x")]),
            }],
        )
        .unwrap();
        let text = serde_json::to_string(&result.entries()[0]).unwrap();
        assert_eq!(
            text,
            r#"{"kind":"insert","key":{"path":"/a"},"values":{"path":"/a","size":null,"hash":"x"}}"#
        );
    }

    #[test]
    fn empty_result() {
        let result = build(&schema(), &[]).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.table(), "files");
        assert!(result.entries().is_empty());
    }

    #[test]
    fn entry_accessors() {
        let schema = schema();
        let result = build(
            &schema,
            &[Change::Delete {
                row: Row::new(vec![Value::from("/c"), Value::Integer(3), Value::Null]),
            }],
        )
        .unwrap();
        let entry = &result.entries()[0];
        assert_eq!(entry.kind(), ChangeKind::Delete);
        assert_eq!(entry.key().get("path"), Some(&Value::from("/c")));
    }
}

//! Snapshot decoding.
//!
//! A snapshot is either a JSON array of row objects or the envelope
//! `{"table": "<name>", "data": [...]}`. Decoding validates every row
//! against the schema before anything touches the backend.

use crate::error::{CoreError, CoreResult};
use crate::row::{Row, RowKey};
use crate::schema::Schema;
use crate::value::Value;
use serde_json::Map;
use std::collections::BTreeSet;

/// A decoded snapshot: the complete state the table must converge to.
///
/// Every row carries non-null primary-key values, and no two rows share a
/// primary key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    rows: Vec<Row>,
}

impl Snapshot {
    /// Decodes a JSON snapshot payload.
    ///
    /// Missing non-key columns are stored as null; values are coerced to the
    /// column affinity.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Parse`] if the payload is not a row list or
    /// envelope, the envelope names another table, a row is not an object,
    /// names an undeclared column, lacks a primary-key value, or repeats the
    /// primary key of an earlier row.
    pub fn decode(schema: &Schema, payload: &serde_json::Value) -> CoreResult<Self> {
        let items = match payload {
            serde_json::Value::Array(items) => items,
            serde_json::Value::Object(envelope) => envelope_rows(schema, envelope)?,
            _ => {
                return Err(CoreError::parse(
                    "snapshot must be an array of rows or a {table, data} object",
                ))
            }
        };

        let mut rows = Vec::new();
        rows.try_reserve_exact(items.len())?;
        for (index, item) in items.iter().enumerate() {
            let object = item
                .as_object()
                .ok_or_else(|| CoreError::parse(format!("row {index} is not an object")))?;
            rows.push(decode_row(schema, index, object)?);
        }

        Self::from_rows(schema, rows)
    }

    /// Builds a snapshot from already-typed rows.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Parse`] if a row has the wrong arity, a null
    /// primary-key value, or a duplicate primary key.
    pub fn from_rows(schema: &Schema, rows: Vec<Row>) -> CoreResult<Self> {
        let mut keys: BTreeSet<RowKey> = BTreeSet::new();
        for (index, row) in rows.iter().enumerate() {
            if row.values().len() != schema.columns().len() {
                return Err(CoreError::parse(format!(
                    "row {index} has {} values, table {} has {} columns",
                    row.values().len(),
                    schema.table(),
                    schema.columns().len()
                )));
            }
            let key = row.key(schema);
            if key.0.iter().any(Value::is_null) {
                return Err(CoreError::parse(format!(
                    "row {index} has a null primary-key value"
                )));
            }
            if !keys.insert(key) {
                return Err(CoreError::parse(format!(
                    "row {index} repeats the primary key of an earlier row"
                )));
            }
        }
        Ok(Self { rows })
    }

    /// Rows in submission order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the snapshot holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn envelope_rows<'a>(
    schema: &Schema,
    envelope: &'a Map<String, serde_json::Value>,
) -> CoreResult<&'a Vec<serde_json::Value>> {
    if let Some(table) = envelope.get("table") {
        let table = table
            .as_str()
            .ok_or_else(|| CoreError::parse("snapshot \"table\" must be a string"))?;
        if !table.eq_ignore_ascii_case(schema.table()) {
            return Err(CoreError::parse(format!(
                "snapshot is for table {table}, handle synchronizes {}",
                schema.table()
            )));
        }
    }
    envelope
        .get("data")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| CoreError::parse("snapshot object must carry a \"data\" array"))
}

fn decode_row(
    schema: &Schema,
    index: usize,
    object: &Map<String, serde_json::Value>,
) -> CoreResult<Row> {
    if let Some(unknown) = object.keys().find(|k| schema.column_index(k).is_none()) {
        return Err(CoreError::parse(format!(
            "row {index} has undeclared column {unknown}"
        )));
    }

    let mut values = Vec::new();
    values.try_reserve_exact(schema.columns().len())?;
    for (column_index, column) in schema.columns().iter().enumerate() {
        let value = match object.get(&column.name) {
            Some(json) => Value::from_json(json)
                .map_err(|e| CoreError::parse(format!("row {index}, column {}: {e}", column.name)))?
                .coerce(column.affinity),
            None => Value::Null,
        };
        if value.is_null() && schema.is_key_column(column_index) {
            return Err(CoreError::parse(format!(
                "row {index} is missing primary-key column {}",
                column.name
            )));
        }
        values.push(value);
    }
    Ok(Row::new(values))
}

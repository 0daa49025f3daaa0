//! Rows, primary keys and named column sets.

use crate::schema::Schema;
use crate::value::Value;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// One row of the synchronized table.
///
/// Values are positional, aligned with [`Schema::columns`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    /// Creates a row from values in column order.
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Values in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value of the column at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Extracts the primary key.
    pub fn key(&self, schema: &Schema) -> RowKey {
        RowKey(
            schema
                .primary_key()
                .iter()
                .map(|&i| self.values[i].clone())
                .collect(),
        )
    }

    /// Names every value with its column.
    pub fn to_fields(&self, schema: &Schema) -> Fields {
        Fields(
            schema
                .columns()
                .iter()
                .zip(&self.values)
                .map(|(c, v)| (c.name.clone(), v.clone()))
                .collect(),
        )
    }
}

/// Primary-key values of a row, in key order.
///
/// Ordering is lexicographic over the key columns, which matches
/// `ORDER BY` on the key in the backend.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RowKey(pub Vec<Value>);

impl RowKey {
    /// Names the key values with their columns.
    pub fn to_fields(&self, schema: &Schema) -> Fields {
        Fields(
            schema
                .key_names()
                .zip(&self.0)
                .map(|(name, v)| (name.to_owned(), v.clone()))
                .collect(),
        )
    }
}

/// An ordered list of `(column, value)` pairs.
///
/// Serializes as a JSON object whose keys follow the table definition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fields(pub Vec<(String, Value)>);

impl Fields {
    /// Looks up a value by column name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no pairs.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

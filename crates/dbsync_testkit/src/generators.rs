//! Property-based test generators using proptest.
//!
//! Snapshots are generated for the `files` table (see
//! [`FILES_TABLE`](crate::FILES_TABLE)). Paths come from a small alphabet so
//! that consecutive snapshots overlap and exercise inserts, modifies and
//! deletes together.

use proptest::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// One row of the `files` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRow {
    /// Primary key.
    pub path: String,
    /// File size, possibly unknown.
    pub size: Option<i64>,
    /// Content hash, possibly unknown.
    pub hash: Option<String>,
}

/// A generated snapshot: rows keyed by path, so keys are unique.
pub type FileSnapshot = BTreeMap<String, FileRow>;

/// Strategy for generating primary-key paths.
pub fn path_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("/[a-e]{1,2}").expect("Invalid regex")
}

/// Strategy for generating one row.
pub fn file_row_strategy() -> impl Strategy<Value = FileRow> {
    (
        path_strategy(),
        prop::option::of(-3i64..1_000),
        prop::option::of(prop::string::string_regex("[a-c]{0,3}").expect("Invalid regex")),
    )
        .prop_map(|(path, size, hash)| FileRow { path, size, hash })
}

/// Strategy for generating a snapshot of up to `max_rows` rows.
pub fn snapshot_strategy(max_rows: usize) -> impl Strategy<Value = FileSnapshot> {
    prop::collection::vec(file_row_strategy(), 0..=max_rows).prop_map(|rows| {
        rows.into_iter()
            .map(|row| (row.path.clone(), row))
            .collect()
    })
}

/// Strategy for generating a sequence of snapshots.
pub fn snapshot_sequence_strategy(
    max_snapshots: usize,
    max_rows: usize,
) -> impl Strategy<Value = Vec<FileSnapshot>> {
    prop::collection::vec(snapshot_strategy(max_rows), 1..=max_snapshots)
}

/// Renders a snapshot as the JSON payload accepted by the engine.
///
/// Rows are emitted in path order.
pub fn snapshot_json(snapshot: &FileSnapshot) -> serde_json::Value {
    serde_json::to_value(snapshot.values().collect::<Vec<_>>()).expect("rows serialize")
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn paths_are_absolute(path in path_strategy()) {
            prop_assert!(path.starts_with('/'));
            prop_assert!(path.len() >= 2);
        }

        #[test]
        fn snapshot_json_has_one_object_per_row(snapshot in snapshot_strategy(8)) {
            let json = snapshot_json(&snapshot);
            let rows = json.as_array().unwrap();
            prop_assert_eq!(rows.len(), snapshot.len());
            for (row, expected) in rows.iter().zip(snapshot.values()) {
                prop_assert_eq!(row["path"].as_str(), Some(expected.path.as_str()));
            }
        }
    }
}

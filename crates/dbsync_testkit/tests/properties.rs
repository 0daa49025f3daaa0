//! Property tests for the update pipeline.

use dbsync_core::{ChangeKind, DiffResult, ErrorKind, Value};
use dbsync_testkit::prelude::*;
use proptest::prelude::*;
use std::collections::BTreeSet;

fn persisted(table: &TestTable) -> FileSnapshot {
    table
        .rows()
        .into_iter()
        .map(|row| {
            let path = match row.get(0) {
                Some(Value::Text(s)) => s.clone(),
                other => panic!("unexpected path {other:?}"),
            };
            let size = match row.get(1) {
                Some(Value::Integer(i)) => Some(*i),
                Some(Value::Null) => None,
                other => panic!("unexpected size {other:?}"),
            };
            let hash = match row.get(2) {
                Some(Value::Text(s)) => Some(s.clone()),
                Some(Value::Null) => None,
                other => panic!("unexpected hash {other:?}"),
            };
            (path.clone(), FileRow { path, size, hash })
        })
        .collect()
}

fn keys_of(result: &DiffResult, kind: ChangeKind) -> Vec<String> {
    result
        .entries()
        .iter()
        .filter(|e| e.kind() == kind)
        .map(|e| match e.key().get("path") {
            Some(Value::Text(s)) => s.clone(),
            other => panic!("unexpected key {other:?}"),
        })
        .collect()
}

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn converges_to_every_snapshot(sequence in snapshot_sequence_strategy(5, 8)) {
        let table = TestTable::memory();
        for snapshot in &sequence {
            table.update(&snapshot_json(snapshot)).unwrap();
            prop_assert_eq!(&persisted(&table), snapshot);
        }
    }

    #[test]
    fn second_application_is_empty(snapshot in snapshot_strategy(10)) {
        let table = TestTable::memory();
        table.update(&snapshot_json(&snapshot)).unwrap();
        let again = table.update(&snapshot_json(&snapshot)).unwrap();
        prop_assert!(again.is_empty());
    }

    #[test]
    fn entries_match_symmetric_difference(
        before in snapshot_strategy(8),
        after in snapshot_strategy(8),
    ) {
        let table = TestTable::memory();
        table.update(&snapshot_json(&before)).unwrap();
        let result = table.update(&snapshot_json(&after)).unwrap();

        let inserted: BTreeSet<String> = keys_of(&result, ChangeKind::Insert).into_iter().collect();
        let deleted: BTreeSet<String> = keys_of(&result, ChangeKind::Delete).into_iter().collect();
        let modified: BTreeSet<String> = keys_of(&result, ChangeKind::Modify).into_iter().collect();

        let expected_inserted: BTreeSet<String> =
            after.keys().filter(|k| !before.contains_key(*k)).cloned().collect();
        let expected_deleted: BTreeSet<String> =
            before.keys().filter(|k| !after.contains_key(*k)).cloned().collect();
        let expected_modified: BTreeSet<String> = after
            .iter()
            .filter(|(k, row)| before.get(*k).is_some_and(|old| old != *row))
            .map(|(k, _)| k.clone())
            .collect();

        prop_assert_eq!(inserted, expected_inserted);
        prop_assert_eq!(deleted, expected_deleted);
        prop_assert_eq!(modified, expected_modified);
        prop_assert_eq!(
            result.len(),
            result.inserted() + result.modified() + result.deleted()
        );
    }

    #[test]
    fn ordering_is_deterministic(
        before in snapshot_strategy(8),
        after in snapshot_strategy(8),
    ) {
        let run = || {
            let table = TestTable::memory();
            table.update(&snapshot_json(&before)).unwrap();
            table.update(&snapshot_json(&after)).unwrap()
        };
        let first = run();
        prop_assert_eq!(&first, &run());

        // Deletes come last, in key order.
        let kinds: Vec<ChangeKind> = first.entries().iter().map(|e| e.kind()).collect();
        let first_delete = kinds.iter().position(|k| *k == ChangeKind::Delete).unwrap_or(kinds.len());
        prop_assert!(kinds[first_delete..].iter().all(|k| *k == ChangeKind::Delete));

        let deleted = keys_of(&first, ChangeKind::Delete);
        let mut sorted = deleted.clone();
        sorted.sort();
        prop_assert_eq!(deleted, sorted);
    }

    #[test]
    fn rejected_snapshot_changes_nothing(
        before in snapshot_strategy(8),
        after in snapshot_strategy(8),
    ) {
        let table = TestTable::memory();
        table.update(&snapshot_json(&before)).unwrap();

        let mut payload = snapshot_json(&after);
        payload.as_array_mut().unwrap().push(serde_json::json!({"size": 1}));

        let err = table.update(&payload).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::Parse);
        prop_assert_eq!(&persisted(&table), &before);
    }
}

#[test]
fn file_table_is_idempotent() {
    with_file_table(|table| {
        let snapshot = scenarios::files_snapshot(5);
        table.update(&snapshot).unwrap();
        assert_eq!(table.rows().len(), 5);
        assert!(table.update(&snapshot).unwrap().is_empty());
    });
}

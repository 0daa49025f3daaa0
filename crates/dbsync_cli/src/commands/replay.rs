//! Replay command implementation.
//!
//! Applies snapshot files to one handle, in order, writing each diff to
//! `<output>/snapshot_<idx>.json`.

use crate::config::DriverConfig;
use dbsync_core::{Schema, SyncHandle};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of a replay run.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Diff files written.
    pub written: Vec<PathBuf>,
    /// Indices of snapshots that were rejected.
    pub failed: Vec<usize>,
}

/// Runs the replay command.
pub fn run(
    config_path: &Path,
    snapshots: &[PathBuf],
    output: &Path,
    dump: bool,
) -> Result<ReplaySummary, Box<dyn std::error::Error>> {
    let config = DriverConfig::load(config_path)?;
    if let Some(persistance) = &config.persistance {
        info!(persistance = %persistance, "persistence option is informational");
    }

    let handle = dbsync_core::initialize_with_config(&config.to_core())?;
    let outcome = replay(handle, snapshots, output);
    if dump && outcome.is_ok() {
        dump_table(handle, &config.sql_statement)?;
    }
    dbsync_core::teardown(handle)?;

    let summary = outcome?;
    println!(
        "Resulting files are located in {} ({} written, {} failed)",
        output.display(),
        summary.written.len(),
        summary.failed.len()
    );
    Ok(summary)
}

fn replay(
    handle: SyncHandle,
    snapshots: &[PathBuf],
    output: &Path,
) -> Result<ReplaySummary, Box<dyn std::error::Error>> {
    fs::create_dir_all(output)?;

    let mut summary = ReplaySummary::default();
    for (idx, path) in snapshots.iter().enumerate() {
        info!(file = %path.display(), idx, "processing snapshot");

        let snapshot = match load_snapshot(path) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "unreadable snapshot, skipping");
                summary.failed.push(idx);
                continue;
            }
        };

        match dbsync_core::update_with_snapshot(handle, &snapshot) {
            Ok(result) => {
                let target = output.join(format!("snapshot_{idx}.json"));
                fs::write(&target, serde_json::to_string_pretty(&result)? + "\n")?;
                dbsync_core::free_result(result);
                summary.written.push(target);
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "snapshot rejected, skipping");
                summary.failed.push(idx);
            }
        }
    }

    if let Ok(stats) = dbsync_core::stats(handle) {
        info!(
            updates = stats.updates,
            failed = stats.failed_updates,
            inserted = stats.inserted,
            modified = stats.modified,
            deleted = stats.deleted,
            "replay finished"
        );
    }
    Ok(summary)
}

/// Reads a snapshot file.
///
/// The file holds either the snapshot itself or an array wrapping it as the
/// first element. Only a row array or a `{"table", "data": [...]}` envelope
/// counts as wrapped; a plain row never does, since column values are
/// scalars.
fn load_snapshot(path: &Path) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    let document: serde_json::Value = serde_json::from_str(&text)?;
    Ok(unwrap_snapshot(document))
}

fn unwrap_snapshot(document: serde_json::Value) -> serde_json::Value {
    match document {
        serde_json::Value::Array(mut items) if is_wrapped(&items) => items.swap_remove(0),
        other => other,
    }
}

fn is_wrapped(items: &[serde_json::Value]) -> bool {
    match items.first() {
        Some(serde_json::Value::Array(_)) => true,
        Some(serde_json::Value::Object(first)) => {
            first.get("data").is_some_and(serde_json::Value::is_array)
                && first.get("table").map_or(true, serde_json::Value::is_string)
        }
        _ => false,
    }
}

fn dump_table(handle: SyncHandle, definition: &str) -> Result<(), Box<dyn std::error::Error>> {
    let schema = Schema::parse(definition)?;
    for row in dbsync_core::select_all(handle)? {
        println!("{}", serde_json::to_string(&row.to_fields(&schema))?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(dir: &Path, name: &str, value: &serde_json::Value) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, value.to_string()).unwrap();
        path
    }

    #[test]
    fn unwraps_wrapped_snapshots() {
        let rows = json!([{"path": "/a"}]);
        assert_eq!(unwrap_snapshot(json!([rows.clone()])), rows);
        assert_eq!(unwrap_snapshot(rows.clone()), rows);

        let envelope = json!({"table": "files", "data": []});
        assert_eq!(unwrap_snapshot(json!([envelope.clone()])), envelope);
        assert_eq!(unwrap_snapshot(json!([])), json!([]));
    }

    #[test]
    fn rows_with_a_data_column_are_not_unwrapped() {
        let rows = json!([{"id": 1, "data": "payload"}, {"id": 2, "data": null}]);
        assert_eq!(unwrap_snapshot(rows.clone()), rows);

        let rows = json!([{"data": [1], "table": 3}]);
        assert_eq!(unwrap_snapshot(rows.clone()), rows);

        let envelope = json!({"data": [{"id": 1, "data": "x"}]});
        assert_eq!(unwrap_snapshot(json!([envelope.clone()])), envelope);
    }

    #[test]
    fn replays_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("sync.db");
        let config = write(
            dir.path(),
            "config.json",
            &json!([{
                "db_name": db.to_str().unwrap(),
                "db_type": "0",
                "host_type": "1",
                "persistance": "0",
                "sql_statement": "CREATE TABLE files (path TEXT PRIMARY KEY, size INTEGER, hash TEXT)"
            }]),
        );
        let snapshots = vec![
            write(dir.path(), "s0.json", &json!([[{"path": "/a", "size": 1, "hash": "x"}]])),
            write(dir.path(), "s1.json", &json!([[{"path": "/b"}, {"size": 2}]])),
            write(dir.path(), "s2.json", &json!([{"table": "files", "data": []}])),
        ];
        let output = dir.path().join("out");

        let summary = run(&config, &snapshots, &output, true).unwrap();
        assert_eq!(summary.failed, vec![1]);
        assert_eq!(
            summary.written,
            vec![output.join("snapshot_0.json"), output.join("snapshot_2.json")]
        );

        let first: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(output.join("snapshot_0.json")).unwrap())
                .unwrap();
        assert_eq!(first["inserted"], 1);
        let last: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(output.join("snapshot_2.json")).unwrap())
                .unwrap();
        assert_eq!(last["deleted"], 1);
        assert!(!output.join("snapshot_1.json").exists());
    }

    #[test]
    fn bad_config_fails_before_any_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = write(
            dir.path(),
            "config.json",
            &json!({"db_name": ":memory:", "db_type": "0", "host_type": "0",
                    "sql_statement": "CREATE TABLE t (a TEXT)"}),
        );
        let output = dir.path().join("out");
        assert!(run(&config, &[], &output, false).is_err());
        assert!(!output.exists());
    }
}

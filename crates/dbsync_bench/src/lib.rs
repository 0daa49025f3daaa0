//! Shared helpers for dbsync benchmarks.

use rand::Rng;
use serde_json::{json, Value};

/// Table definition used by every benchmark.
pub const FILES_TABLE: &str =
    "CREATE TABLE files (path TEXT PRIMARY KEY, size INTEGER, hash TEXT)";

/// Generates a snapshot of `rows` rows with random sizes and hashes.
///
/// Paths are `/bench/<i>`, so two snapshots of the same length share every
/// key and differ only in their non-key columns.
pub fn random_snapshot(rows: usize) -> Value {
    let mut rng = rand::thread_rng();
    Value::Array(
        (0..rows)
            .map(|i| {
                json!({
                    "path": format!("/bench/{i}"),
                    "size": rng.gen_range(0..1_000_000i64),
                    "hash": format!("{:016x}", rng.gen::<u64>()),
                })
            })
            .collect(),
    )
}

/// Returns `snapshot` with roughly `percent`% of its rows given a new size.
pub fn perturb(snapshot: &Value, percent: u32) -> Value {
    let mut rng = rand::thread_rng();
    let mut out = snapshot.clone();
    if let Some(rows) = out.as_array_mut() {
        for row in rows.iter_mut() {
            if rng.gen_ratio(percent.min(100), 100) {
                row["size"] = json!(rng.gen_range(0..1_000_000i64));
            }
        }
    }
    out
}

/// A rolling window of `rows` rows starting at `offset`.
pub fn window_snapshot(offset: usize, rows: usize) -> Value {
    Value::Array(
        (offset..offset + rows)
            .map(|i| json!({"path": format!("/bench/{i}"), "size": i, "hash": "h"}))
            .collect(),
    )
}

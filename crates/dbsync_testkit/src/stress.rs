//! Stress tests for dbsync.
//!
//! These exercise the update pipeline under repeated and concurrent use of
//! one handle, and under many handles at once.

use crate::fixtures::{scenarios::files_snapshot, FILES_TABLE};
use dbsync_core::{Config, DbEngineType, HandleRegistry, HostType, SyncHandle};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total updates attempted.
    pub total_ops: usize,
    /// Successful updates.
    pub successful_ops: usize,
    /// Failed updates.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Updates per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total updates: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} updates/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of updates to perform.
    pub operations: usize,
    /// Number of concurrent threads (for concurrent tests).
    pub threads: usize,
    /// Rows per snapshot.
    pub rows: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 1_000,
            threads: 4,
            rows: 100,
        }
    }
}

/// Snapshot `i` of a rolling window: rows shift by one each step, so every
/// update inserts one row, deletes one row and modifies the rest.
fn rolling_snapshot(i: usize, rows: usize) -> serde_json::Value {
    serde_json::Value::Array(
        (i..i + rows)
            .map(|n| json!({"path": format!("/roll/{n}"), "size": i, "hash": "h"}))
            .collect(),
    )
}

fn memory_handle(registry: &HandleRegistry) -> SyncHandle {
    registry
        .initialize(&Config::new(
            HostType::Agent,
            DbEngineType::Sqlite3,
            ":memory:",
            FILES_TABLE,
        ))
        .expect("Failed to initialize table")
}

/// Run a sequential update stress test on one handle.
pub fn stress_sequential_updates(
    registry: &HandleRegistry,
    handle: SyncHandle,
    config: &StressConfig,
) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        match registry.update_with_snapshot(handle, &rolling_snapshot(i, config.rows)) {
            Ok(_) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run an update stress test where every other snapshot is malformed.
pub fn stress_rejected_updates(
    registry: &HandleRegistry,
    handle: SyncHandle,
    config: &StressConfig,
) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let snapshot = if i % 2 == 0 {
            // Last row lacks its primary key.
            let mut rows = files_snapshot(config.rows);
            if let Some(items) = rows.as_array_mut() {
                items.push(json!({"size": 1}));
            }
            rows
        } else {
            rolling_snapshot(i, config.rows)
        };

        match registry.update_with_snapshot(handle, &snapshot) {
            Ok(_) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a concurrent update stress test: every thread updates the same handle.
pub fn stress_concurrent_updates(
    registry: Arc<HandleRegistry>,
    handle: SyncHandle,
    config: &StressConfig,
) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let ops_per_thread = config.operations / config.threads;

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let registry = Arc::clone(&registry);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let rows = config.rows;

            thread::spawn(move || {
                for i in 0..ops_per_thread {
                    let snapshot = rolling_snapshot(t * ops_per_thread + i, rows);
                    match registry.update_with_snapshot(handle, &snapshot) {
                        Ok(_) => {
                            successful.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(_) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Run a stress test where every thread owns a handle of its own.
pub fn stress_concurrent_handles(
    registry: Arc<HandleRegistry>,
    config: &StressConfig,
) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let ops_per_thread = config.operations / config.threads;

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let rows = config.rows;

            thread::spawn(move || {
                let handle = memory_handle(&registry);
                for i in 0..ops_per_thread {
                    match registry.update_with_snapshot(handle, &rolling_snapshot(i, rows)) {
                        Ok(_) => {
                            successful.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(_) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
                registry.teardown(handle).expect("Failed to tear down");
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

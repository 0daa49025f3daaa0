//! Per-handle synchronization statistics.
//!
//! Counters are atomic so they can be read while an update is in progress
//! on another thread. Values only ever increase.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters for one synchronization context.
#[derive(Debug, Default)]
pub struct SyncStats {
    updates: AtomicU64,
    failed_updates: AtomicU64,
    inserted: AtomicU64,
    modified: AtomicU64,
    deleted: AtomicU64,
}

impl SyncStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful update and the entries it produced.
    pub(crate) fn record_update(&self, inserted: usize, modified: usize, deleted: usize) {
        self.updates.fetch_add(1, Ordering::Relaxed);
        self.inserted.fetch_add(inserted as u64, Ordering::Relaxed);
        self.modified.fetch_add(modified as u64, Ordering::Relaxed);
        self.deleted.fetch_add(deleted as u64, Ordering::Relaxed);
    }

    /// Records a rejected or rolled-back update.
    pub(crate) fn record_failure(&self) {
        self.failed_updates.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of successful updates.
    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }

    /// Returns the number of failed updates.
    pub fn failed_updates(&self) -> u64 {
        self.failed_updates.load(Ordering::Relaxed)
    }

    /// Returns a point-in-time copy of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            updates: self.updates(),
            failed_updates: self.failed_updates(),
            inserted: self.inserted.load(Ordering::Relaxed),
            modified: self.modified.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`SyncStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct StatsSnapshot {
    /// Successful updates.
    pub updates: u64,
    /// Updates that failed with a parse or apply error.
    pub failed_updates: u64,
    /// Rows inserted across all updates.
    pub inserted: u64,
    /// Rows modified across all updates.
    pub modified: u64,
    /// Rows deleted across all updates.
    pub deleted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        assert_eq!(SyncStats::new().snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn record_updates() {
        let stats = SyncStats::new();
        stats.record_update(2, 1, 0);
        stats.record_update(0, 0, 3);
        stats.record_failure();

        let snap = stats.snapshot();
        assert_eq!(snap.updates, 2);
        assert_eq!(snap.failed_updates, 1);
        assert_eq!((snap.inserted, snap.modified, snap.deleted), (2, 1, 3));
    }

    #[test]
    fn concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(SyncStats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..100 {
                        s.record_update(1, 0, 0);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(stats.updates(), 800);
        assert_eq!(stats.snapshot().inserted, 800);
    }
}

//! Core type definitions for dbsync.

use std::fmt;

/// Role of the host running the engine.
///
/// The role is carried as context only; it never changes diff semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostType {
    /// Central manager node.
    Manager,
    /// Monitored agent node.
    Agent,
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostType::Manager => f.write_str("manager"),
            HostType::Agent => f.write_str("agent"),
        }
    }
}

/// Relational engine backing a synchronization context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbEngineType {
    /// Embedded SQLite 3.
    Sqlite3,
    /// No engine selected; initialization fails.
    Undefined,
}

impl fmt::Display for DbEngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbEngineType::Sqlite3 => f.write_str("sqlite3"),
            DbEngineType::Undefined => f.write_str("undefined"),
        }
    }
}

/// Opaque identifier of a live synchronization context.
///
/// Handles are allocated from a monotonically increasing counter and never
/// reused, so a stale handle cannot alias a newer context. Zero is the
/// "no handle" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SyncHandle(pub u64);

impl SyncHandle {
    /// The "no handle" sentinel.
    pub const NONE: SyncHandle = SyncHandle(0);

    /// Creates a handle from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns true for the sentinel value.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for SyncHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel() {
        assert!(SyncHandle::NONE.is_none());
        assert!(!SyncHandle::new(3).is_none());
        assert_eq!(SyncHandle::new(3).as_u64(), 3);
    }

    #[test]
    fn handle_display() {
        assert_eq!(format!("{}", SyncHandle::new(42)), "handle:42");
        assert_eq!(format!("{}", HostType::Agent), "agent");
        assert_eq!(format!("{}", DbEngineType::Sqlite3), "sqlite3");
    }
}

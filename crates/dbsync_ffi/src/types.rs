//! Type definitions for FFI.

use dbsync_core::{DbEngineType, DiffResult, HostType};
use std::ffi::CString;

/// Host role value selecting [`HostType::Manager`].
pub const DBSYNC_HOST_MANAGER: i32 = 0;
/// Host role value selecting [`HostType::Agent`].
pub const DBSYNC_HOST_AGENT: i32 = 1;

/// Engine value selecting SQLite 3.
pub const DBSYNC_ENGINE_SQLITE3: i32 = 0;
/// Engine value with no backend; initialization fails.
pub const DBSYNC_ENGINE_UNDEFINED: i32 = 1;

/// Maps a C host role to [`HostType`]. Anything but the manager value is an
/// agent.
pub fn host_type_from_c(value: i32) -> HostType {
    if value == DBSYNC_HOST_MANAGER {
        HostType::Manager
    } else {
        HostType::Agent
    }
}

/// Maps a C engine selector to [`DbEngineType`]. Unknown values are
/// undefined.
pub fn engine_from_c(value: i32) -> DbEngineType {
    if value == DBSYNC_ENGINE_SQLITE3 {
        DbEngineType::Sqlite3
    } else {
        DbEngineType::Undefined
    }
}

/// An opaque diff result.
///
/// Returned by `dbsync_update_with_snapshot` and owned by the caller until
/// released with `dbsync_free_result`. Never dereference directly.
pub struct DbSyncDiff {
    pub(crate) result: DiffResult,
    pub(crate) json: CString,
}

impl DbSyncDiff {
    /// Wraps a result, rendering its JSON once so borrowed pointers stay
    /// valid for the lifetime of the object.
    ///
    /// Infallible: the update behind `result` has already committed. Writing
    /// into a `Vec` cannot fail and serde_json escapes NUL as `\u0000`, so
    /// neither fallback below is ever taken.
    pub(crate) fn new(result: DiffResult) -> Self {
        let mut text = serde_json::to_vec(&result).unwrap_or_default();
        text.retain(|&b| b != 0);
        let json = CString::new(text).unwrap_or_default();
        Self { result, json }
    }
}

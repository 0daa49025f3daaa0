//! Synchronization FFI functions.

use crate::error::{clear_last_error, report, set_last_error, DbSyncResult};
use crate::types::{engine_from_c, host_type_from_c, DbSyncDiff};
use dbsync_core::{Config, SyncHandle};
use std::ffi::{c_char, CStr};

/// Borrows a C string argument as UTF-8.
///
/// # Safety
///
/// `ptr` must be null or a valid null-terminated string that outlives `'a`.
unsafe fn str_arg<'a>(ptr: *const c_char, what: &str) -> Result<&'a str, DbSyncResult> {
    if ptr.is_null() {
        set_last_error(format!("null {what}"));
        return Err(DbSyncResult::NullPointer);
    }
    CStr::from_ptr(ptr).to_str().map_err(|_| {
        set_last_error(format!("invalid UTF-8 in {what}"));
        DbSyncResult::InvalidArgument
    })
}

/// Creates a synchronization context.
///
/// # Arguments
///
/// * `host_type` - `DBSYNC_HOST_MANAGER` or `DBSYNC_HOST_AGENT`
/// * `engine_type` - `DBSYNC_ENGINE_SQLITE3` or `DBSYNC_ENGINE_UNDEFINED`
/// * `db_name` - Database path, or `:memory:`
/// * `sql_statement` - `CREATE TABLE` statement of the synchronized table
///
/// # Returns
///
/// A nonzero handle on success, 0 on failure (see `dbsync_get_last_error`).
///
/// # Safety
///
/// `db_name` and `sql_statement` must be valid null-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn dbsync_initialize(
    host_type: i32,
    engine_type: i32,
    db_name: *const c_char,
    sql_statement: *const c_char,
) -> u64 {
    clear_last_error();

    let (db_name, sql) = match (
        str_arg(db_name, "database name"),
        str_arg(sql_statement, "table definition"),
    ) {
        (Ok(db_name), Ok(sql)) => (db_name, sql),
        _ => return SyncHandle::NONE.as_u64(),
    };

    let config = Config::new(
        host_type_from_c(host_type),
        engine_from_c(engine_type),
        db_name,
        sql,
    );
    match dbsync_core::initialize_with_config(&config) {
        Ok(handle) => handle.as_u64(),
        Err(e) => {
            report(&e);
            SyncHandle::NONE.as_u64()
        }
    }
}

/// Synchronizes a table with a JSON snapshot.
///
/// # Arguments
///
/// * `handle` - Handle returned by `dbsync_initialize`
/// * `snapshot_json` - Snapshot as null-terminated JSON
/// * `out_result` - Receives the diff result on success
///
/// # Returns
///
/// `DbSyncResult::Ok` on success, error code otherwise. `*out_result` is only
/// written on success and must then be released with `dbsync_free_result`.
///
/// # Safety
///
/// - `snapshot_json` must be a valid null-terminated string
/// - `out_result` must be a valid pointer
#[no_mangle]
pub unsafe extern "C" fn dbsync_update_with_snapshot(
    handle: u64,
    snapshot_json: *const c_char,
    out_result: *mut *mut DbSyncDiff,
) -> DbSyncResult {
    clear_last_error();

    if out_result.is_null() {
        set_last_error("null pointer argument");
        return DbSyncResult::NullPointer;
    }
    let text = match str_arg(snapshot_json, "snapshot") {
        Ok(text) => text,
        Err(code) => return code,
    };

    let snapshot: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            set_last_error(format!("snapshot is not valid JSON: {e}"));
            return DbSyncResult::ParseError;
        }
    };

    let result = match dbsync_core::update_with_snapshot(SyncHandle::new(handle), &snapshot) {
        Ok(result) => result,
        Err(e) => return report(&e),
    };

    *out_result = Box::into_raw(Box::new(DbSyncDiff::new(result)));
    DbSyncResult::Ok
}

/// Returns the JSON rendering of a diff result.
///
/// # Returns
///
/// A borrowed string valid until the result is freed, or null if `result`
/// is null.
///
/// # Safety
///
/// `result` must be null or a live result from `dbsync_update_with_snapshot`.
#[no_mangle]
pub unsafe extern "C" fn dbsync_result_json(result: *const DbSyncDiff) -> *const c_char {
    if result.is_null() {
        return std::ptr::null();
    }
    (*result).json.as_ptr()
}

/// Reads the entry counts of a diff result.
///
/// # Safety
///
/// - `result` must be a live result from `dbsync_update_with_snapshot`
/// - each output pointer must be valid
#[no_mangle]
pub unsafe extern "C" fn dbsync_result_counts(
    result: *const DbSyncDiff,
    out_inserted: *mut u64,
    out_modified: *mut u64,
    out_deleted: *mut u64,
) -> DbSyncResult {
    clear_last_error();

    if result.is_null() || out_inserted.is_null() || out_modified.is_null() || out_deleted.is_null()
    {
        set_last_error("null pointer argument");
        return DbSyncResult::NullPointer;
    }

    let diff = &(*result).result;
    *out_inserted = diff.inserted() as u64;
    *out_modified = diff.modified() as u64;
    *out_deleted = diff.deleted() as u64;
    DbSyncResult::Ok
}

/// Releases a diff result and nulls the caller's pointer.
///
/// A second call with the same pointer-to-pointer sees null and returns
/// `NullPointer` instead of freeing twice.
///
/// # Safety
///
/// `result` must be a valid pointer to either null or a live result from
/// `dbsync_update_with_snapshot`.
#[no_mangle]
pub unsafe extern "C" fn dbsync_free_result(result: *mut *mut DbSyncDiff) -> DbSyncResult {
    clear_last_error();

    if result.is_null() || (*result).is_null() {
        set_last_error("null pointer argument");
        return DbSyncResult::NullPointer;
    }

    let diff = Box::from_raw(*result);
    *result = std::ptr::null_mut();
    dbsync_core::free_result(diff.result);
    DbSyncResult::Ok
}

/// Invalidates a handle and releases its backend.
///
/// Blocks until an in-flight update on the handle finishes.
#[no_mangle]
pub extern "C" fn dbsync_teardown(handle: u64) -> DbSyncResult {
    clear_last_error();

    match dbsync_core::teardown(SyncHandle::new(handle)) {
        Ok(()) => DbSyncResult::Ok,
        Err(e) => report(&e),
    }
}

/// Tears down every handle in the process.
///
/// # Returns
///
/// The number of handles released.
#[no_mangle]
pub extern "C" fn dbsync_teardown_all() -> u64 {
    clear_last_error();
    dbsync_core::teardown_all() as u64
}

/// Returns the library version as a null-terminated string.
///
/// The returned pointer is static and should not be freed.
#[no_mangle]
pub extern "C" fn dbsync_version() -> *const c_char {
    static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
    VERSION.as_ptr().cast()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::dbsync_get_last_error;
    use crate::types::{DBSYNC_ENGINE_SQLITE3, DBSYNC_ENGINE_UNDEFINED, DBSYNC_HOST_AGENT};
    use std::ffi::CString;

    const FILES: &str = "CREATE TABLE files (path TEXT PRIMARY KEY, size INTEGER, hash TEXT)";

    fn open() -> u64 {
        let db = CString::new(":memory:").unwrap();
        let sql = CString::new(FILES).unwrap();
        let handle =
            unsafe { dbsync_initialize(DBSYNC_HOST_AGENT, DBSYNC_ENGINE_SQLITE3, db.as_ptr(), sql.as_ptr()) };
        assert_ne!(handle, 0);
        handle
    }

    unsafe fn update(handle: u64, json: &str, out: &mut *mut DbSyncDiff) -> DbSyncResult {
        let snapshot = CString::new(json).unwrap();
        dbsync_update_with_snapshot(handle, snapshot.as_ptr(), out)
    }

    fn last_error() -> String {
        let ptr = dbsync_get_last_error();
        assert!(!ptr.is_null());
        unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_owned()
    }

    #[test]
    fn update_and_free() {
        let handle = open();
        let mut result: *mut DbSyncDiff = std::ptr::null_mut();

        unsafe {
            let status = update(
                handle,
                r#"[{"path": "/etc/passwd", "size": 1234, "hash": "abc"}]"#,
                &mut result,
            );
            assert_eq!(status, DbSyncResult::Ok);
            assert!(!result.is_null());

            let (mut inserted, mut modified, mut deleted) = (0u64, 0u64, 0u64);
            assert_eq!(
                dbsync_result_counts(result, &mut inserted, &mut modified, &mut deleted),
                DbSyncResult::Ok
            );
            assert_eq!((inserted, modified, deleted), (1, 0, 0));

            let json = CStr::from_ptr(dbsync_result_json(result)).to_str().unwrap();
            let parsed: serde_json::Value = serde_json::from_str(json).unwrap();
            assert_eq!(parsed["entries"][0]["kind"], "insert");
            assert_eq!(parsed["entries"][0]["key"]["path"], "/etc/passwd");

            assert_eq!(dbsync_free_result(&mut result), DbSyncResult::Ok);
            assert!(result.is_null());
            // Second release is detected.
            assert_eq!(dbsync_free_result(&mut result), DbSyncResult::NullPointer);
        }

        assert_eq!(dbsync_teardown(handle), DbSyncResult::Ok);
    }

    #[test]
    fn escaped_nul_round_trips() {
        let handle = open();
        let mut result: *mut DbSyncDiff = std::ptr::null_mut();

        unsafe {
            let status = update(handle, r#"[{"path": "/a\u0000b"}]"#, &mut result);
            assert_eq!(status, DbSyncResult::Ok);

            let json = CStr::from_ptr(dbsync_result_json(result)).to_str().unwrap();
            let parsed: serde_json::Value = serde_json::from_str(json).unwrap();
            assert_eq!(parsed["entries"][0]["key"]["path"], "/a\u{0}b");
            assert_eq!(dbsync_free_result(&mut result), DbSyncResult::Ok);
        }

        dbsync_teardown(handle);
    }

    #[test]
    fn failed_update_leaves_out_param_untouched() {
        let handle = open();
        let mut result: *mut DbSyncDiff = std::ptr::null_mut();

        unsafe {
            assert_eq!(
                update(handle, r#"[{"size": 1}]"#, &mut result),
                DbSyncResult::ParseError
            );
            assert!(result.is_null());
            assert!(last_error().contains("primary-key"));

            assert_eq!(update(handle, "not json", &mut result), DbSyncResult::ParseError);
            assert!(result.is_null());
        }

        dbsync_teardown(handle);
    }

    #[test]
    fn invalid_handles() {
        let handle = open();
        assert_eq!(dbsync_teardown(handle), DbSyncResult::Ok);
        assert_eq!(dbsync_teardown(handle), DbSyncResult::InvalidHandle);

        let mut result: *mut DbSyncDiff = std::ptr::null_mut();
        let status = unsafe { update(handle, "[]", &mut result) };
        assert_eq!(status, DbSyncResult::InvalidHandle);
        assert!(result.is_null());
    }

    #[test]
    fn initialize_failures_return_zero() {
        let db = CString::new(":memory:").unwrap();
        let no_key = CString::new("CREATE TABLE t (a TEXT)").unwrap();
        let sql = CString::new(FILES).unwrap();

        unsafe {
            assert_eq!(
                dbsync_initialize(DBSYNC_HOST_AGENT, DBSYNC_ENGINE_SQLITE3, db.as_ptr(), no_key.as_ptr()),
                0
            );
            assert!(last_error().contains("primary key"));

            assert_eq!(
                dbsync_initialize(DBSYNC_HOST_AGENT, DBSYNC_ENGINE_UNDEFINED, db.as_ptr(), sql.as_ptr()),
                0
            );
            assert_eq!(
                dbsync_initialize(DBSYNC_HOST_AGENT, DBSYNC_ENGINE_SQLITE3, std::ptr::null(), sql.as_ptr()),
                0
            );
        }
    }

    #[test]
    fn null_pointer_handling() {
        let handle = open();
        unsafe {
            let snapshot = CString::new("[]").unwrap();
            assert_eq!(
                dbsync_update_with_snapshot(handle, snapshot.as_ptr(), std::ptr::null_mut()),
                DbSyncResult::NullPointer
            );
            let mut result: *mut DbSyncDiff = std::ptr::null_mut();
            assert_eq!(
                dbsync_update_with_snapshot(handle, std::ptr::null(), &mut result),
                DbSyncResult::NullPointer
            );
            assert_eq!(dbsync_free_result(std::ptr::null_mut()), DbSyncResult::NullPointer);
            assert!(dbsync_result_json(std::ptr::null()).is_null());
        }
        dbsync_teardown(handle);
    }

    #[test]
    fn version() {
        let ver = dbsync_version();
        assert!(!ver.is_null());

        let s = unsafe { CStr::from_ptr(ver) };
        assert_eq!(s.to_str().unwrap(), env!("CARGO_PKG_VERSION"));
    }
}

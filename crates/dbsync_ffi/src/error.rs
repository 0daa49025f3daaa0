//! Status codes and the thread-local last error.

use dbsync_core::{CoreError, ErrorKind};
use std::cell::RefCell;
use std::ffi::CString;

/// Status code returned by FFI functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbSyncResult {
    /// Operation succeeded.
    Ok = 0,
    /// Unclassified failure.
    Error = 1,
    /// A required pointer argument was null.
    NullPointer = 2,
    /// An argument was not valid UTF-8 or out of range.
    InvalidArgument = 3,
    /// The table definition is unusable.
    SchemaError = 4,
    /// The backend could not be opened.
    OpenError = 5,
    /// The handle is unknown or torn down.
    InvalidHandle = 6,
    /// The snapshot is malformed.
    ParseError = 7,
    /// Applying the diff failed; nothing was changed.
    ApplyError = 8,
    /// Out of memory.
    OutOfMemory = 9,
}

impl DbSyncResult {
    /// Returns true if the result indicates success.
    pub fn is_ok(self) -> bool {
        self == DbSyncResult::Ok
    }

    /// Returns true if the result indicates an error.
    pub fn is_err(self) -> bool {
        self != DbSyncResult::Ok
    }
}

impl From<ErrorKind> for DbSyncResult {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Schema => DbSyncResult::SchemaError,
            ErrorKind::Open => DbSyncResult::OpenError,
            ErrorKind::InvalidHandle => DbSyncResult::InvalidHandle,
            ErrorKind::Parse => DbSyncResult::ParseError,
            ErrorKind::Apply => DbSyncResult::ApplyError,
            ErrorKind::Allocation => DbSyncResult::OutOfMemory,
        }
    }
}

/// Error code type for C compatibility.
pub type ErrorCode = i32;

impl From<DbSyncResult> for ErrorCode {
    fn from(result: DbSyncResult) -> Self {
        result as ErrorCode
    }
}

// Thread-local storage for last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Sets the last error message.
pub fn set_last_error(message: impl Into<String>) {
    let msg = message.into();
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clears the last error.
pub fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Records `err` as the last error and returns its status code.
pub(crate) fn report(err: &CoreError) -> DbSyncResult {
    set_last_error(err.to_string());
    err.kind().into()
}

/// Gets the last error message as a C string.
///
/// Returns null if no error is set.
///
/// # Safety
///
/// The returned pointer is valid until the next FFI call on this thread.
#[no_mangle]
pub extern "C" fn dbsync_get_last_error() -> *const std::ffi::c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(cstr) => cstr.as_ptr(),
        None => std::ptr::null(),
    })
}

/// Clears the last error message.
#[no_mangle]
pub extern "C" fn dbsync_clear_error() {
    clear_last_error();
}

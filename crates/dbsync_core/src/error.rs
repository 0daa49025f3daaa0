//! Error types for the synchronization engine.

use thiserror::Error;

/// Result type for engine operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Broad error category, stable across releases.
///
/// Bindings map these onto integer status codes; the variants of
/// [`CoreError`] may grow without changing this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The table definition is unusable.
    Schema,
    /// The backend could not be opened.
    Open,
    /// The handle is unknown or already torn down.
    InvalidHandle,
    /// The snapshot payload is malformed.
    Parse,
    /// Reading or writing the backend failed.
    Apply,
    /// Memory for a result could not be reserved.
    Allocation,
}

/// Errors that can occur in engine operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The table definition could not be turned into a schema.
    #[error("schema error: {message}")]
    Schema {
        /// Description of the problem.
        message: String,
    },

    /// The persisted table does not match the table definition.
    #[error("schema mismatch on table {table}: {message}")]
    SchemaMismatch {
        /// Table name.
        table: String,
        /// Description of the difference.
        message: String,
    },

    /// The backend could not be opened or created.
    #[error("failed to open {db_name}: {message}")]
    Open {
        /// Database name passed to initialize.
        db_name: String,
        /// Description of the failure.
        message: String,
    },

    /// The handle does not refer to a live context.
    #[error("invalid handle: {0}")]
    InvalidHandle(u64),

    /// The snapshot payload is malformed.
    #[error("snapshot parse error: {message}")]
    Parse {
        /// Description of the problem.
        message: String,
    },

    /// A statement failed while applying changes; the transaction was rolled back.
    #[error("apply failed: {message}")]
    Apply {
        /// Description of the failure.
        message: String,
    },

    /// The backend failed outside of a write transaction.
    #[error("backend error: {0}")]
    Backend(#[from] rusqlite::Error),

    /// Memory could not be reserved for a result.
    #[error("allocation failed: {0}")]
    Allocation(#[from] std::collections::TryReserveError),
}

impl CoreError {
    /// Creates a schema error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Creates a schema mismatch error.
    pub fn schema_mismatch(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Creates an open error.
    pub fn open(db_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Open {
            db_name: db_name.into(),
            message: message.into(),
        }
    }

    /// Creates a snapshot parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Creates an apply error.
    pub fn apply(message: impl Into<String>) -> Self {
        Self::Apply {
            message: message.into(),
        }
    }

    /// Returns the broad category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Schema { .. } | CoreError::SchemaMismatch { .. } => ErrorKind::Schema,
            CoreError::Open { .. } => ErrorKind::Open,
            CoreError::InvalidHandle(_) => ErrorKind::InvalidHandle,
            CoreError::Parse { .. } => ErrorKind::Parse,
            CoreError::Apply { .. } | CoreError::Backend(_) => ErrorKind::Apply,
            CoreError::Allocation(_) => ErrorKind::Allocation,
        }
    }
}

//! # Recordstore - schema-on-write records over SQLite
//!
//! A host application declares named tables (a primary key plus typed,
//! non-null fields), then inserts, updates and bulk-loads records keyed by an
//! identifier, and materializes whole tables back into keyed maps.
//!
//! Recordstore provides:
//! - A tagged scalar [`Value`] bound as statement parameters, never interpolated
//! - A process-local schema registry owned by each [`RecordStore`]
//! - Scoped connection handling: every call opens, works, and closes
//! - Single-transaction batch loads that roll back on the first failure
//!
//! The store assumes a single writer. Callers sharing one across threads must
//! serialize access themselves (e.g. wrap it in a `Mutex`).

pub mod value;
pub mod schema;
pub mod sql;
pub mod storage;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use value::{Key, Record, Snapshot, Value};
pub use schema::{Column, ColumnType, SchemaRegistry, TableSchema};
pub use storage::{ConnectionStats, RecordStore, StatementObserver, TracingObserver};

/// Result type alias for Recordstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Recordstore operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Table not registered in this process: {0}")]
    SchemaNotRegistered(String),

    #[error("Column mismatch on {table}.{column}: {reason}")]
    ColumnMismatch {
        table: String,
        column: String,
        reason: MismatchReason,
    },

    #[error("Constraint violation: {0}")]
    ConstraintViolation(#[source] rusqlite::Error),

    #[error("Query error: {0}")]
    Query(#[source] rusqlite::Error),

    #[error("Batch on {table} aborted at key {key}: {source}")]
    BatchFailed {
        table: String,
        key: Key,
        source: Box<Error>,
    },

    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Invalid column type: {0}")]
    InvalidColumnType(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

impl Error {
    /// True when the engine rejected a write on a uniqueness or not-null
    /// constraint, including when that happened inside a batch.
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Error::ConstraintViolation(_) => true,
            Error::BatchFailed { source, .. } => source.is_constraint_violation(),
            _ => false,
        }
    }

    pub(crate) fn mismatch(table: &str, column: &str, reason: MismatchReason) -> Self {
        Error::ColumnMismatch {
            table: table.to_string(),
            column: column.to_string(),
            reason,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::ConstraintViolation) => Error::ConstraintViolation(err),
            _ => Error::Query(err),
        }
    }
}

/// Why a record did not line up with its registered table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchReason {
    /// Insert omitted a declared column
    Missing,
    /// Record named a column the table does not declare
    Unknown,
    /// Record carried the primary key, which is passed separately
    PrimaryKey,
    /// Column declared twice in one table
    Duplicate,
}

impl std::fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            MismatchReason::Missing => "required column missing from record",
            MismatchReason::Unknown => "column not declared for this table",
            MismatchReason::PrimaryKey => "primary key must be passed as the id, not in the record",
            MismatchReason::Duplicate => "column declared more than once",
        };
        f.write_str(text)
    }
}

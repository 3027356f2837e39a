//! Database error types.

use derive_more::{Display, Error};
use diesel::result::DatabaseErrorKind;
use tracing::instrument;

/// Category of a storage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum DbErrorKind {
    /// A uniqueness constraint rejected the write (duplicate player name).
    #[display("conflict")]
    Conflict,
    /// The referenced row does not exist.
    #[display("not found")]
    NotFound,
    /// Connectivity, query or serialization failure.
    #[display("fault")]
    Fault,
}

/// Database error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Database {} error: {} at {}:{}", kind, message, file, line)]
pub struct DbError {
    /// What went wrong, coarsely.
    pub kind: DbErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl DbError {
    /// Creates a new database error of the given kind with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(kind: DbErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Connectivity or query failure.
    #[track_caller]
    pub fn fault(message: impl Into<String>) -> Self {
        Self::new(DbErrorKind::Fault, message)
    }

    /// Uniqueness violation.
    #[track_caller]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(DbErrorKind::Conflict, message)
    }

    /// Missing row.
    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(DbErrorKind::NotFound, message)
    }
}

impl From<diesel::result::Error> for DbError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Self::conflict(format!("Unique violation: {}", info.message()))
            }
            diesel::result::Error::NotFound => Self::not_found("Row not found"),
            other => Self::fault(format!("Diesel error: {}", other)),
        }
    }
}

impl From<diesel::ConnectionError> for DbError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        Self::fault(format!("Connection error: {}", err))
    }
}

impl From<serde_json::Error> for DbError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::fault(format!("Serialization error: {}", err))
    }
}

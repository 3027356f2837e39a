//! Ledger-level error types.

use derive_more::{Display, Error, From};
use tracing::instrument;

use crate::db::{DbError, DbErrorKind};

/// Rejected input, reported against the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("Invalid {}: {}", field, message)]
pub struct ValidationError {
    /// Request field that failed validation.
    pub field: &'static str,
    /// Human-readable reason.
    pub message: String,
}

impl ValidationError {
    /// Creates a new validation error.
    #[instrument(skip(message))]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Coarse failure category used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ErrorKind {
    /// Missing, malformed or out-of-range input.
    Validation,
    /// Referenced entity absent.
    NotFound,
    /// Duplicate player name.
    Conflict,
    /// Connectivity or query failure.
    Storage,
}

/// Any failure a ledger operation can report.
#[derive(Debug, Clone, Display, Error, From)]
pub enum LedgerError {
    /// Input was rejected before touching storage.
    #[display("{}", _0)]
    Validation(ValidationError),
    /// The store reported a failure.
    #[display("{}", _0)]
    Db(DbError),
}

impl LedgerError {
    /// Categorizes the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Db(err) => match err.kind {
                DbErrorKind::Conflict => ErrorKind::Conflict,
                DbErrorKind::NotFound => ErrorKind::NotFound,
                DbErrorKind::Fault => ErrorKind::Storage,
            },
        }
    }

    /// Message without location decoration, suitable for clients.
    pub fn detail(&self) -> String {
        match self {
            Self::Validation(err) => err.message.clone(),
            Self::Db(err) => err.message.clone(),
        }
    }
}

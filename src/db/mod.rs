//! Persistence layer for session records, player statistics, players and settings.

// Private module declarations
mod error;
mod kv;
mod models;
mod provision;
mod repository;
mod schema; // Diesel generated schema - internal use only
mod store;

// Crate-level exports via pub use
pub use error::{DbError, DbErrorKind};
pub use kv::KvStore;
pub use models::{
    DEFAULT_INITIAL_POINTS, DEFAULT_INITIAL_POINTS_KEY, DailySummary, NewSessionRecord, Player,
    PlayerStats, SessionRecord, Settings,
};
pub use provision::{ProvisionOutcome, TABLES, missing_tables, provision};
pub use repository::SqliteStore;
pub use store::LedgerStore;

//! Poker Tally library - poker session ledger
//!
//! Records per-session point balances for each player, keeps a running
//! aggregate per player, and serves both over a small JSON HTTP API.
//!
//! # Architecture
//!
//! - **Store**: [`LedgerStore`] with a SQLite backend ([`SqliteStore`]) and an
//!   in-memory key-value backend ([`KvStore`])
//! - **Statistics**: incremental per-player aggregate ([`stats::accumulate`])
//! - **Service**: validation and lenient reads ([`LedgerService`])
//! - **Server**: axum router ([`LedgerApi`])
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use poker_tally::{LedgerService, RecordSubmission, SqliteStore};
//!
//! # fn example() -> anyhow::Result<()> {
//! let store = SqliteStore::new("poker_tally.db".to_string())?;
//! let service = LedgerService::new(Arc::new(store));
//! service.provision()?;
//!
//! let record = service.submit_record(RecordSubmission {
//!     player_name: Some("Alice".to_string()),
//!     date: Some("2024-01-01".to_string()),
//!     initial_points: Some(20_000),
//!     final_points: Some(15_000),
//!     add_ons: Some(1),
//!     point_balance: None,
//! })?;
//! assert_eq!(*record.point_balance(), -25_000);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod db;
mod error;
mod ledger_service;
mod server;

// Public modules
pub mod report;
pub mod stats;
pub mod submission;

// Crate-level exports - Configuration
pub use config::{Backend, ConfigError, DATABASE_URL_ENV, HOST_ENV, PORT_ENV, ServerConfig};

// Crate-level exports - Persistence
pub use db::{
    DEFAULT_INITIAL_POINTS, DEFAULT_INITIAL_POINTS_KEY, DailySummary, DbError, DbErrorKind,
    KvStore, LedgerStore, NewSessionRecord, Player, PlayerStats, ProvisionOutcome, SessionRecord,
    Settings, SqliteStore, TABLES, missing_tables, provision,
};

// Crate-level exports - Errors
pub use error::{ErrorKind, LedgerError, ValidationError};

// Crate-level exports - Service and HTTP
pub use ledger_service::LedgerService;
pub use server::{
    AddPlayerRequest, ApiError, DUPLICATE_PLAYER_MESSAGE, DateQuery, DeletePlayerRequest,
    ErrorBody, INVALID_DEFAULT_POINTS, LedgerApi, PlayerQuery, UpdateSettingsRequest,
};

// Crate-level exports - Submission
pub use submission::RecordSubmission;

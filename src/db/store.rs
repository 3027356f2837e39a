//! Storage interface shared by every persistence backend.

use chrono::NaiveDate;

use crate::db::{
    DbError, NewSessionRecord, Player, PlayerStats, ProvisionOutcome, SessionRecord, Settings,
};

/// Persistence contract for the ledger.
///
/// Callers only see this trait; neither the relational layout nor the
/// key-value layout leaks past it.
pub trait LedgerStore: Send + Sync + std::fmt::Debug {
    /// Makes sure every table or collection exists and the default stake is seeded.
    ///
    /// Safe to call any number of times.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend is unreachable or creation fails.
    fn ensure_schema(&self) -> Result<ProvisionOutcome, DbError>;

    /// Stores a record and folds its balance into the owning player's statistics.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if either write fails.
    fn append_record(&self, record: NewSessionRecord) -> Result<SessionRecord, DbError>;

    /// Gets the aggregate for a player, `None` if they have no records.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    fn player_stats(&self, player_name: &str) -> Result<Option<PlayerStats>, DbError>;

    /// All records for a player, newest date first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    fn records_for_player(&self, player_name: &str) -> Result<Vec<SessionRecord>, DbError>;

    /// All records for one date, by player name ascending.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    fn records_for_date(&self, date: NaiveDate) -> Result<Vec<SessionRecord>, DbError>;

    /// Every date with at least one record, descending.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    fn distinct_dates(&self) -> Result<Vec<NaiveDate>, DbError>;

    /// All players, by name ascending.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    fn list_players(&self) -> Result<Vec<Player>, DbError>;

    /// Registers a new player.
    ///
    /// # Errors
    ///
    /// Returns a [`DbError`] of kind `Conflict` if the name is taken.
    fn add_player(&self, name: &str) -> Result<Player, DbError>;

    /// Removes a player. Their records and statistics are left in place.
    ///
    /// # Errors
    ///
    /// Returns a [`DbError`] of kind `NotFound` if no player has that id.
    fn delete_player(&self, id: &str) -> Result<(), DbError>;

    /// Reads the settings together with the current player names.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs or the stored value is corrupt.
    fn settings(&self) -> Result<Settings, DbError>;

    /// Overwrites the default initial stake. Callers validate the value.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    fn set_default_initial_points(&self, value: i64) -> Result<(), DbError>;
}

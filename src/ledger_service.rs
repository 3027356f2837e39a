//! Ledger business logic layer.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use crate::{
    DailySummary, LedgerError, LedgerStore, Player, PlayerStats, ProvisionOutcome,
    RecordSubmission, SessionRecord, Settings, ValidationError,
};

/// Service layer for ledger operations.
///
/// Wraps a [`LedgerStore`] with boundary validation, balance computation and
/// lenient read paths: reads log storage failures and fall back to an empty
/// result instead of failing the caller.
#[derive(Debug, Clone)]
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
}

impl LedgerService {
    /// Creates a new ledger service backed by the given store.
    #[instrument(skip(store))]
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        info!("Creating LedgerService");
        Self { store }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Provisions the backing schema. Call once before serving traffic.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the store is unreachable or creation fails.
    #[instrument(skip(self))]
    pub fn provision(&self) -> Result<ProvisionOutcome, LedgerError> {
        let outcome = self.store.ensure_schema()?;
        info!(%outcome, "Schema provisioned");
        Ok(outcome)
    }

    /// Validates a submission, then stores it and updates the player's statistics.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Validation`] for bad input and
    /// [`LedgerError::Db`] if storage fails.
    #[instrument(skip(self, submission))]
    pub fn submit_record(
        &self,
        submission: RecordSubmission,
    ) -> Result<SessionRecord, LedgerError> {
        let record = submission.validate()?;
        debug!(
            player_name = %record.player_name(),
            point_balance = record.point_balance(),
            "Submitting record"
        );
        let stored = self.store.append_record(record)?;
        info!(record_id = %stored.id(), "Record submitted");
        Ok(stored)
    }

    /// Returns a player's records, newest date first. Empty on storage failure.
    #[instrument(skip(self))]
    pub fn records(&self, player_name: &str) -> Vec<SessionRecord> {
        self.store
            .records_for_player(player_name)
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to load player records");
                Vec::new()
            })
    }

    /// Returns a player's aggregate. `None` if absent or on storage failure.
    #[instrument(skip(self))]
    pub fn stats(&self, player_name: &str) -> Option<PlayerStats> {
        self.store.player_stats(player_name).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load player stats");
            None
        })
    }

    /// Returns a date's records by player name. Empty on storage failure.
    #[instrument(skip(self))]
    pub fn daily_records(&self, date: NaiveDate) -> Vec<SessionRecord> {
        self.store.records_for_date(date).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load daily records");
            Vec::new()
        })
    }

    /// Returns a date's records together with their total balance.
    #[instrument(skip(self))]
    pub fn daily_summary(&self, date: NaiveDate) -> DailySummary {
        DailySummary::from_records(date, self.daily_records(date))
    }

    /// Returns every date that has records, newest first. Empty on storage failure.
    #[instrument(skip(self))]
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.store.distinct_dates().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load record dates");
            Vec::new()
        })
    }

    /// Returns all players by name. Empty on storage failure.
    #[instrument(skip(self))]
    pub fn players(&self) -> Vec<Player> {
        self.store.list_players().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load players");
            Vec::new()
        })
    }

    /// Registers a player under the trimmed name.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Validation`] for a blank name and a
    /// conflict-kind [`LedgerError::Db`] if the name is taken.
    #[instrument(skip(self))]
    pub fn add_player(&self, name: &str) -> Result<Player, LedgerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::new("name", "player name is required").into());
        }
        Ok(self.store.add_player(name)?)
    }

    /// Removes a player. Their records and statistics stay.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Validation`] for a blank id and a not-found-kind
    /// [`LedgerError::Db`] if no such player exists.
    #[instrument(skip(self))]
    pub fn delete_player(&self, id: &str) -> Result<(), LedgerError> {
        if id.trim().is_empty() {
            return Err(ValidationError::new("id", "player id is required").into());
        }
        Ok(self.store.delete_player(id.trim())?)
    }

    /// Returns settings. Falls back to the defaults on storage failure.
    #[instrument(skip(self))]
    pub fn settings(&self) -> Settings {
        self.store.settings().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load settings, using defaults");
            Settings::default()
        })
    }

    /// Changes the stake new records are pre-filled with.
    ///
    /// Stored records are unaffected.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Validation`] if `value <= 0`.
    #[instrument(skip(self))]
    pub fn update_default_initial_points(&self, value: i64) -> Result<(), LedgerError> {
        if value <= 0 {
            return Err(ValidationError::new(
                "defaultInitialPoints",
                "default initial points must be a positive number",
            )
            .into());
        }
        self.store.set_default_initial_points(value)?;
        Ok(())
    }
}

//! SQLite-backed ledger store.

use chrono::NaiveDate;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Text};
use tracing::{debug, info, instrument};

use crate::db::models::SettingRow;
use crate::db::provision::provision;
use crate::db::{
    DEFAULT_INITIAL_POINTS, DEFAULT_INITIAL_POINTS_KEY, DbError, DbErrorKind, LedgerStore,
    NewSessionRecord, Player, PlayerStats, ProvisionOutcome, SessionRecord, Settings, schema,
};

/// Folds one balance into the player's aggregate in a single statement.
///
/// Every expression on the right of `SET` reads the row as it was before the
/// update, so the running values cannot be lost between a read and a write.
const UPSERT_STATS: &str = "
    INSERT INTO stats (player_name, total_games, total_balance, average_balance, best_balance, worst_balance)
    VALUES (?, 1, ?, ?, ?, ?)
    ON CONFLICT (player_name) DO UPDATE SET
        total_games = stats.total_games + 1,
        total_balance = stats.total_balance + excluded.total_balance,
        average_balance = CAST(stats.total_balance + excluded.total_balance AS REAL) / (stats.total_games + 1),
        best_balance = MAX(stats.best_balance, excluded.best_balance),
        worst_balance = MIN(stats.worst_balance, excluded.worst_balance)
";

/// Milliseconds a connection waits on a locked database before failing.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Relational ledger store over a SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: String,
}

impl SqliteStore {
    /// Creates a store for the database at the given path. Nothing is opened yet.
    ///
    /// Note that `":memory:"` gives every connection its own empty database,
    /// so use a file for anything that spans more than one call.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the path is empty.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Result<Self, DbError> {
        if db_path.trim().is_empty() {
            return Err(DbError::fault("Database path must not be empty"));
        }
        info!(path = %db_path, "Creating SqliteStore");
        Ok(Self { db_path })
    }

    /// Path of the backing database file.
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        let mut conn = SqliteConnection::establish(&self.db_path).map_err(|e| {
            DbError::fault(format!("Failed to connect to '{}': {}", self.db_path, e))
        })?;
        conn.batch_execute(&format!("PRAGMA busy_timeout = {};", BUSY_TIMEOUT_MS))?;
        Ok(conn)
    }
}

impl LedgerStore for SqliteStore {
    #[instrument(skip(self))]
    fn ensure_schema(&self) -> Result<ProvisionOutcome, DbError> {
        let mut conn = self.connection()?;
        provision(&mut conn)
    }

    #[instrument(
        skip(self, record),
        fields(player_name = %record.player_name(), date = %record.date())
    )]
    fn append_record(&self, record: NewSessionRecord) -> Result<SessionRecord, DbError> {
        debug!("Appending session record");
        let mut conn = self.connection()?;
        let record = record.stamp();

        conn.transaction::<_, DbError, _>(|conn| {
            diesel::insert_into(schema::records::table)
                .values(&record)
                .execute(conn)?;

            diesel::sql_query(UPSERT_STATS)
                .bind::<Text, _>(record.player_name().clone())
                .bind::<BigInt, _>(*record.point_balance())
                .bind::<Double, _>(*record.point_balance() as f64)
                .bind::<BigInt, _>(*record.point_balance())
                .bind::<BigInt, _>(*record.point_balance())
                .execute(conn)
                .map_err(|e| DbError::fault(format!("Stats update failed: {}", e)))?;
            Ok(())
        })?;

        info!(
            record_id = %record.id(),
            player_name = %record.player_name(),
            point_balance = record.point_balance(),
            "Session record stored"
        );
        Ok(record)
    }

    #[instrument(skip(self))]
    fn player_stats(&self, player_name: &str) -> Result<Option<PlayerStats>, DbError> {
        let mut conn = self.connection()?;
        let stats = schema::stats::table
            .filter(schema::stats::player_name.eq(player_name))
            .select(PlayerStats::as_select())
            .first(&mut conn)
            .optional()?;
        debug!(found = stats.is_some(), "Player stats loaded");
        Ok(stats)
    }

    #[instrument(skip(self))]
    fn records_for_player(&self, player_name: &str) -> Result<Vec<SessionRecord>, DbError> {
        let mut conn = self.connection()?;
        let records = schema::records::table
            .filter(schema::records::player_name.eq(player_name))
            .order((
                schema::records::date.desc(),
                schema::records::created_at.desc(),
            ))
            .select(SessionRecord::as_select())
            .load(&mut conn)?;
        info!(count = records.len(), "Player records loaded");
        Ok(records)
    }

    #[instrument(skip(self))]
    fn records_for_date(&self, date: NaiveDate) -> Result<Vec<SessionRecord>, DbError> {
        let mut conn = self.connection()?;
        let records = schema::records::table
            .filter(schema::records::date.eq(date))
            .order((
                schema::records::player_name.asc(),
                schema::records::created_at.asc(),
            ))
            .select(SessionRecord::as_select())
            .load(&mut conn)?;
        info!(count = records.len(), "Daily records loaded");
        Ok(records)
    }

    #[instrument(skip(self))]
    fn distinct_dates(&self) -> Result<Vec<NaiveDate>, DbError> {
        let mut conn = self.connection()?;
        let dates = schema::records::table
            .select(schema::records::date)
            .distinct()
            .order(schema::records::date.desc())
            .load::<NaiveDate>(&mut conn)?;
        debug!(count = dates.len(), "Distinct dates loaded");
        Ok(dates)
    }

    #[instrument(skip(self))]
    fn list_players(&self) -> Result<Vec<Player>, DbError> {
        let mut conn = self.connection()?;
        let players = schema::players::table
            .order(schema::players::name.asc())
            .select(Player::as_select())
            .load(&mut conn)?;
        debug!(count = players.len(), "Players loaded");
        Ok(players)
    }

    #[instrument(skip(self))]
    fn add_player(&self, name: &str) -> Result<Player, DbError> {
        let mut conn = self.connection()?;
        let player = Player::register(name.to_string());

        diesel::insert_into(schema::players::table)
            .values(&player)
            .execute(&mut conn)
            .map_err(|e| match DbError::from(e) {
                err if err.kind == DbErrorKind::Conflict => {
                    DbError::conflict(format!("Player '{}' already exists", name))
                }
                err => err,
            })?;

        info!(player_id = %player.id(), name = %player.name(), "Player added");
        Ok(player)
    }

    #[instrument(skip(self))]
    fn delete_player(&self, id: &str) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        let deleted = diesel::delete(schema::players::table.filter(schema::players::id.eq(id)))
            .execute(&mut conn)?;
        if deleted == 0 {
            return Err(DbError::not_found(format!("No player with id '{}'", id)));
        }
        info!(player_id = %id, "Player deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    fn settings(&self) -> Result<Settings, DbError> {
        let mut conn = self.connection()?;

        let raw = schema::settings::table
            .filter(schema::settings::key.eq(DEFAULT_INITIAL_POINTS_KEY))
            .select(schema::settings::value)
            .first::<String>(&mut conn)
            .optional()?;
        let default_initial_points = match raw {
            Some(raw) => raw.parse::<i64>().map_err(|e| {
                DbError::fault(format!(
                    "Corrupt setting '{}' = '{}': {}",
                    DEFAULT_INITIAL_POINTS_KEY, raw, e
                ))
            })?,
            None => DEFAULT_INITIAL_POINTS,
        };

        let players = schema::players::table
            .select(schema::players::name)
            .order(schema::players::name.asc())
            .load::<String>(&mut conn)?;

        Ok(Settings::new(players, default_initial_points))
    }

    #[instrument(skip(self))]
    fn set_default_initial_points(&self, value: i64) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        let row = SettingRow::new(DEFAULT_INITIAL_POINTS_KEY.to_string(), value.to_string());
        diesel::insert_into(schema::settings::table)
            .values(&row)
            .on_conflict(schema::settings::key)
            .do_update()
            .set(schema::settings::value.eq(&row.value))
            .execute(&mut conn)?;
        info!(value, "Default initial points updated");
        Ok(())
    }
}

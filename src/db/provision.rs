//! Schema provisioning for the relational backend.

use derive_more::Display;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sql_types::Text;
use tracing::{debug, info, instrument};

use crate::db::models::SettingRow;
use crate::db::{DEFAULT_INITIAL_POINTS, DEFAULT_INITIAL_POINTS_KEY, DbError, schema};

/// Logical tables every read and write relies on.
pub const TABLES: [&str; 4] = ["records", "stats", "players", "settings"];

const CREATE_STATEMENTS: [&str; 6] = [
    "CREATE TABLE IF NOT EXISTS records (
        id TEXT PRIMARY KEY NOT NULL,
        player_name TEXT NOT NULL,
        date TEXT NOT NULL,
        initial_points INTEGER NOT NULL,
        final_points INTEGER NOT NULL,
        add_ons INTEGER NOT NULL,
        point_balance INTEGER NOT NULL,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS stats (
        player_name TEXT PRIMARY KEY NOT NULL,
        total_games INTEGER NOT NULL DEFAULT 0,
        total_balance INTEGER NOT NULL DEFAULT 0,
        average_balance REAL NOT NULL DEFAULT 0,
        best_balance INTEGER NOT NULL DEFAULT 0,
        worst_balance INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS players (
        id TEXT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL UNIQUE,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY NOT NULL,
        value TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_records_player_date ON records (player_name, date)",
    "CREATE INDEX IF NOT EXISTS idx_records_date ON records (date)",
];

/// What a provisioning run had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ProvisionOutcome {
    /// Every table was already there.
    #[display("already present")]
    AlreadyPresent,
    /// At least one table was missing and the schema was (re)created.
    #[display("created")]
    Created,
}

#[derive(Debug, QueryableByName)]
struct TableName {
    #[diesel(sql_type = Text)]
    name: String,
}

/// Lists the entries of [`TABLES`] that do not exist yet.
///
/// # Errors
///
/// Returns [`DbError`] if the catalog cannot be read.
#[instrument(skip(conn))]
pub fn missing_tables(conn: &mut SqliteConnection) -> Result<Vec<&'static str>, DbError> {
    let present: Vec<String> =
        diesel::sql_query("SELECT name FROM sqlite_master WHERE type = 'table'")
            .load::<TableName>(conn)?
            .into_iter()
            .map(|t| t.name)
            .collect();

    let missing: Vec<&'static str> = TABLES
        .into_iter()
        .filter(|table| !present.iter().any(|p| p == table))
        .collect();
    debug!(?missing, "Checked table existence");
    Ok(missing)
}

/// Ensures all tables exist and the default stake is seeded.
///
/// Probes connectivity first; creation uses `IF NOT EXISTS` and the seed
/// uses `INSERT OR IGNORE`, so repeated runs are harmless.
///
/// # Errors
///
/// Returns [`DbError`] if the probe or any statement fails.
#[instrument(skip(conn))]
pub fn provision(conn: &mut SqliteConnection) -> Result<ProvisionOutcome, DbError> {
    conn.batch_execute("SELECT 1;")
        .map_err(|e| DbError::fault(format!("Connectivity probe failed: {}", e)))?;
    debug!("Connectivity probe succeeded");

    let missing = missing_tables(conn)?;

    let outcome = conn.transaction::<_, DbError, _>(|conn| {
        let outcome = if missing.is_empty() {
            ProvisionOutcome::AlreadyPresent
        } else {
            info!(?missing, "Tables missing, creating schema");
            for statement in CREATE_STATEMENTS {
                diesel::sql_query(statement).execute(conn)?;
            }
            ProvisionOutcome::Created
        };

        diesel::insert_or_ignore_into(schema::settings::table)
            .values(&SettingRow::new(
                DEFAULT_INITIAL_POINTS_KEY.to_string(),
                DEFAULT_INITIAL_POINTS.to_string(),
            ))
            .execute(conn)?;

        Ok(outcome)
    })?;

    info!(%outcome, "Schema provisioning finished");
    Ok(outcome)
}

//! Database models and domain types.

use chrono::{NaiveDate, NaiveDateTime, Utc};
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::schema;

/// Stake every new record entry is pre-filled with until changed.
pub const DEFAULT_INITIAL_POINTS: i64 = 20_000;

/// Settings key holding the default initial stake.
pub const DEFAULT_INITIAL_POINTS_KEY: &str = "defaultInitialPoints";

/// One poker session's point-count entry for one player.
///
/// Records are append-only: nothing updates or deletes them once stored.
#[derive(
    Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Getters, Serialize, Deserialize,
)]
#[diesel(table_name = schema::records)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    id: String,
    player_name: String,
    date: NaiveDate,
    initial_points: i64,
    final_points: i64,
    add_ons: i32,
    point_balance: i64,
    created_at: NaiveDateTime,
}

/// A validated session record that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Getters, new)]
pub struct NewSessionRecord {
    player_name: String,
    date: NaiveDate,
    initial_points: i64,
    final_points: i64,
    add_ons: i32,
    point_balance: i64,
}

impl NewSessionRecord {
    /// Assigns a fresh identity and creation timestamp.
    #[instrument(skip(self), fields(player_name = %self.player_name, date = %self.date))]
    pub fn stamp(self) -> SessionRecord {
        SessionRecord {
            id: format!("record_{}", uuid::Uuid::new_v4().simple()),
            player_name: self.player_name,
            date: self.date,
            initial_points: self.initial_points,
            final_points: self.final_points,
            add_ons: self.add_ons,
            point_balance: self.point_balance,
            created_at: Utc::now().naive_utc(),
        }
    }
}

/// Running per-player aggregate over every stored session record.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Getters, Serialize, Deserialize, new)]
#[diesel(table_name = schema::stats)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    player_name: String,
    total_games: i64,
    total_balance: i64,
    average_balance: f64,
    best_balance: i64,
    worst_balance: i64,
}

/// A registered player.
#[derive(
    Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable, Getters, Serialize, Deserialize,
)]
#[diesel(table_name = schema::players)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct Player {
    id: String,
    name: String,
    created_at: NaiveDateTime,
}

impl Player {
    /// Creates a player with a fresh identity. Does not persist anything.
    #[instrument]
    pub fn register(name: String) -> Self {
        Self {
            id: format!("player_{}", uuid::Uuid::new_v4().simple()),
            name,
            created_at: Utc::now().naive_utc(),
        }
    }
}

/// Application settings as exposed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize, new)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Names of every registered player, ascending.
    players: Vec<String>,
    /// Stake new record entries are pre-filled with.
    default_initial_points: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            players: Vec::new(),
            default_initial_points: DEFAULT_INITIAL_POINTS,
        }
    }
}

/// Raw `settings` table row.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, new)]
#[diesel(table_name = schema::settings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub(crate) struct SettingRow {
    pub(crate) key: String,
    pub(crate) value: String,
}

/// Per-day rollup of every record stored for one date.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize, new)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    date: NaiveDate,
    record_count: usize,
    total_balance: i64,
    records: Vec<SessionRecord>,
}

impl DailySummary {
    /// Totals the balances of the given records, which must all share `date`.
    #[instrument(skip(records), fields(date = %date, count = records.len()))]
    pub fn from_records(date: NaiveDate, records: Vec<SessionRecord>) -> Self {
        let total_balance = records
            .iter()
            .fold(0i64, |sum, r| sum.saturating_add(r.point_balance));
        Self {
            date,
            record_count: records.len(),
            total_balance,
            records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, balance: i64) -> SessionRecord {
        NewSessionRecord::new(
            name.to_string(),
            NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"),
            20_000,
            20_000 + balance,
            0,
            balance,
        )
        .stamp()
    }

    #[test]
    fn test_stamp_assigns_distinct_ids() {
        let a = record("Alice", 10);
        let b = record("Alice", 10);
        assert_ne!(a.id(), b.id());
        assert!(a.id().starts_with("record_"));
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let json = serde_json::to_value(record("Alice", -500)).expect("serialize");
        assert_eq!(json["playerName"], "Alice");
        assert_eq!(json["date"], "2024-01-01");
        assert_eq!(json["pointBalance"], -500);
        assert_eq!(json["addOns"], 0);
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_daily_summary_totals_balances() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date");
        let summary =
            DailySummary::from_records(date, vec![record("Alice", -25_000), record("Bob", 30_000)]);
        assert_eq!(*summary.record_count(), 2);
        assert_eq!(*summary.total_balance(), 5_000);
    }

    #[test]
    fn test_settings_default_stake() {
        let settings = Settings::default();
        assert_eq!(*settings.default_initial_points(), 20_000);
        let json = serde_json::to_value(&settings).expect("serialize");
        assert_eq!(json["defaultInitialPoints"], 20_000);
        assert!(json["players"].as_array().expect("array").is_empty());
    }
}

//! In-process key-value ledger store.
//!
//! Mirrors the hash/value layout of a hosted key-value service:
//!
//! - `records:<player>` is a hash of record id to JSON record
//! - `stats:<player>` is a JSON aggregate
//! - `players` is a hash of player id to JSON player
//! - `settings` is a hash of setting key to value
//!
//! This layout is not interchangeable with the relational one; moving data
//! between the two needs an explicit migration.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use tracing::{debug, info, instrument};

use crate::db::{
    DEFAULT_INITIAL_POINTS, DEFAULT_INITIAL_POINTS_KEY, DbError, LedgerStore, NewSessionRecord,
    Player, PlayerStats, ProvisionOutcome, SessionRecord, Settings,
};
use crate::stats::accumulate;

const RECORDS_PREFIX: &str = "records:";
const STATS_PREFIX: &str = "stats:";
const PLAYERS_KEY: &str = "players";
const SETTINGS_KEY: &str = "settings";

#[derive(Debug, Default)]
struct KvState {
    hashes: HashMap<String, BTreeMap<String, String>>,
    values: HashMap<String, String>,
}

impl KvState {
    fn hash_values(&self, key: &str) -> impl Iterator<Item = &String> {
        self.hashes.get(key).into_iter().flat_map(|h| h.values())
    }

    fn all_records(&self) -> Result<Vec<SessionRecord>, DbError> {
        let mut records = Vec::new();
        for (key, hash) in &self.hashes {
            if key.starts_with(RECORDS_PREFIX) {
                for raw in hash.values() {
                    records.push(serde_json::from_str::<SessionRecord>(raw)?);
                }
            }
        }
        Ok(records)
    }

    fn players(&self) -> Result<Vec<Player>, DbError> {
        self.hash_values(PLAYERS_KEY)
            .map(|raw| serde_json::from_str::<Player>(raw).map_err(DbError::from))
            .collect()
    }
}

/// Key-value ledger store held in process memory.
///
/// Every operation runs under one lock, which serializes the
/// read-modify-write of the per-player aggregate.
#[derive(Debug, Clone, Default)]
pub struct KvStore {
    state: Arc<Mutex<KvState>>,
}

impl KvStore {
    /// Creates an empty store.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating KvStore");
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, KvState>, DbError> {
        self.state
            .lock()
            .map_err(|e| DbError::fault(format!("Key-value store lock poisoned: {}", e)))
    }
}

impl LedgerStore for KvStore {
    #[instrument(skip(self))]
    fn ensure_schema(&self) -> Result<ProvisionOutcome, DbError> {
        let mut state = self.lock()?;
        let missing =
            !state.hashes.contains_key(PLAYERS_KEY) || !state.hashes.contains_key(SETTINGS_KEY);

        state.hashes.entry(PLAYERS_KEY.to_string()).or_default();
        state
            .hashes
            .entry(SETTINGS_KEY.to_string())
            .or_default()
            .entry(DEFAULT_INITIAL_POINTS_KEY.to_string())
            .or_insert_with(|| DEFAULT_INITIAL_POINTS.to_string());

        let outcome = if missing {
            ProvisionOutcome::Created
        } else {
            ProvisionOutcome::AlreadyPresent
        };
        info!(%outcome, "Key-value collections ready");
        Ok(outcome)
    }

    #[instrument(
        skip(self, record),
        fields(player_name = %record.player_name(), date = %record.date())
    )]
    fn append_record(&self, record: NewSessionRecord) -> Result<SessionRecord, DbError> {
        let record = record.stamp();
        let record_json = serde_json::to_string(&record)?;
        let stats_key = format!("{}{}", STATS_PREFIX, record.player_name());

        let mut state = self.lock()?;
        let prior = state
            .values
            .get(&stats_key)
            .map(|raw| serde_json::from_str::<PlayerStats>(raw))
            .transpose()?;
        let next = accumulate(prior.as_ref(), record.player_name(), *record.point_balance());
        let stats_json = serde_json::to_string(&next)?;

        state
            .hashes
            .entry(format!("{}{}", RECORDS_PREFIX, record.player_name()))
            .or_default()
            .insert(record.id().clone(), record_json);
        state.values.insert(stats_key, stats_json);

        info!(record_id = %record.id(), total_games = next.total_games(), "Session record stored");
        Ok(record)
    }

    #[instrument(skip(self))]
    fn player_stats(&self, player_name: &str) -> Result<Option<PlayerStats>, DbError> {
        let state = self.lock()?;
        let stats = state
            .values
            .get(&format!("{}{}", STATS_PREFIX, player_name))
            .map(|raw| serde_json::from_str::<PlayerStats>(raw))
            .transpose()?;
        Ok(stats)
    }

    #[instrument(skip(self))]
    fn records_for_player(&self, player_name: &str) -> Result<Vec<SessionRecord>, DbError> {
        let state = self.lock()?;
        let mut records = state
            .hash_values(&format!("{}{}", RECORDS_PREFIX, player_name))
            .map(|raw| serde_json::from_str::<SessionRecord>(raw).map_err(DbError::from))
            .collect::<Result<Vec<_>, _>>()?;
        records.sort_by(|a, b| {
            b.date()
                .cmp(a.date())
                .then_with(|| b.created_at().cmp(a.created_at()))
        });
        debug!(count = records.len(), "Player records loaded");
        Ok(records)
    }

    #[instrument(skip(self))]
    fn records_for_date(&self, date: NaiveDate) -> Result<Vec<SessionRecord>, DbError> {
        let state = self.lock()?;
        let mut records: Vec<SessionRecord> = state
            .all_records()?
            .into_iter()
            .filter(|r| *r.date() == date)
            .collect();
        records.sort_by(|a, b| {
            a.player_name()
                .cmp(b.player_name())
                .then_with(|| a.created_at().cmp(b.created_at()))
        });
        debug!(count = records.len(), "Daily records loaded");
        Ok(records)
    }

    #[instrument(skip(self))]
    fn distinct_dates(&self) -> Result<Vec<NaiveDate>, DbError> {
        let state = self.lock()?;
        let mut dates: Vec<NaiveDate> = state.all_records()?.iter().map(|r| *r.date()).collect();
        dates.sort_unstable_by(|a, b| b.cmp(a));
        dates.dedup();
        Ok(dates)
    }

    #[instrument(skip(self))]
    fn list_players(&self) -> Result<Vec<Player>, DbError> {
        let state = self.lock()?;
        let mut players = state.players()?;
        players.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(players)
    }

    #[instrument(skip(self))]
    fn add_player(&self, name: &str) -> Result<Player, DbError> {
        let mut state = self.lock()?;
        if state.players()?.iter().any(|p| p.name() == name) {
            return Err(DbError::conflict(format!("Player '{}' already exists", name)));
        }

        let player = Player::register(name.to_string());
        let json = serde_json::to_string(&player)?;
        state
            .hashes
            .entry(PLAYERS_KEY.to_string())
            .or_default()
            .insert(player.id().clone(), json);

        info!(player_id = %player.id(), "Player added");
        Ok(player)
    }

    #[instrument(skip(self))]
    fn delete_player(&self, id: &str) -> Result<(), DbError> {
        let mut state = self.lock()?;
        let removed = state
            .hashes
            .get_mut(PLAYERS_KEY)
            .and_then(|players| players.remove(id));
        match removed {
            Some(_) => {
                info!(player_id = %id, "Player deleted");
                Ok(())
            }
            None => Err(DbError::not_found(format!("No player with id '{}'", id))),
        }
    }

    #[instrument(skip(self))]
    fn settings(&self) -> Result<Settings, DbError> {
        let state = self.lock()?;
        let default_initial_points = match state
            .hashes
            .get(SETTINGS_KEY)
            .and_then(|h| h.get(DEFAULT_INITIAL_POINTS_KEY))
        {
            Some(raw) => raw.parse::<i64>().map_err(|e| {
                DbError::fault(format!("Corrupt setting '{}': {}", DEFAULT_INITIAL_POINTS_KEY, e))
            })?,
            None => DEFAULT_INITIAL_POINTS,
        };

        let mut names: Vec<String> = state
            .players()?
            .into_iter()
            .map(|p| p.name().clone())
            .collect();
        names.sort();
        Ok(Settings::new(names, default_initial_points))
    }

    #[instrument(skip(self))]
    fn set_default_initial_points(&self, value: i64) -> Result<(), DbError> {
        let mut state = self.lock()?;
        state
            .hashes
            .entry(SETTINGS_KEY.to_string())
            .or_default()
            .insert(DEFAULT_INITIAL_POINTS_KEY.to_string(), value.to_string());
        info!(value, "Default initial points updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submit(store: &KvStore, name: &str, date: (i32, u32, u32), balance: i64) -> SessionRecord {
        let date = NaiveDate::from_ymd_opt(date.0, date.1, date.2).expect("valid date");
        store
            .append_record(NewSessionRecord::new(
                name.to_string(),
                date,
                0,
                balance,
                0,
                balance,
            ))
            .expect("append failed")
    }

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let store = KvStore::new();
        assert_eq!(store.ensure_schema().expect("first"), ProvisionOutcome::Created);
        assert_eq!(
            store.ensure_schema().expect("second"),
            ProvisionOutcome::AlreadyPresent
        );
        assert_eq!(*store.settings().expect("settings").default_initial_points(), 20_000);
    }

    #[test]
    fn test_records_stored_under_player_hash() {
        let store = KvStore::new();
        let record = submit(&store, "Alice", (2024, 1, 1), 100);
        let state = store.lock().expect("lock");
        let hash = state.hashes.get("records:Alice").expect("player hash");
        assert!(hash.contains_key(record.id()));
        assert!(state.values.contains_key("stats:Alice"));
    }

    #[test]
    fn test_stats_accumulate_across_records() {
        let store = KvStore::new();
        submit(&store, "Alice", (2024, 1, 1), -25_000);
        submit(&store, "Alice", (2024, 1, 2), 30_000);

        let stats = store.player_stats("Alice").expect("stats").expect("present");
        assert_eq!(*stats.total_games(), 2);
        assert_eq!(*stats.total_balance(), 5_000);
        assert_eq!(*stats.best_balance(), 30_000);
        assert_eq!(*stats.worst_balance(), -25_000);
        assert!(store.player_stats("Nobody").expect("stats").is_none());
    }

    #[test]
    fn test_dates_and_daily_ordering() {
        let store = KvStore::new();
        submit(&store, "Zed", (2024, 3, 1), 1);
        submit(&store, "Amy", (2024, 3, 1), 2);
        submit(&store, "Amy", (2024, 2, 1), 3);

        let dates = store.distinct_dates().expect("dates");
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid"),
                NaiveDate::from_ymd_opt(2024, 2, 1).expect("valid"),
            ]
        );

        let daily = store
            .records_for_date(NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid"))
            .expect("daily");
        let names: Vec<&str> = daily.iter().map(|r| r.player_name().as_str()).collect();
        assert_eq!(names, ["Amy", "Zed"]);
    }

    #[test]
    fn test_duplicate_player_rejected() {
        let store = KvStore::new();
        store.add_player("Bob").expect("first add");
        let err = store.add_player("Bob").expect_err("duplicate should fail");
        assert_eq!(err.kind, crate::db::DbErrorKind::Conflict);
        assert_eq!(store.list_players().expect("list").len(), 1);
    }

    #[test]
    fn test_delete_unknown_player_is_not_found() {
        let store = KvStore::new();
        let err = store.delete_player("player_missing").expect_err("should fail");
        assert_eq!(err.kind, crate::db::DbErrorKind::NotFound);
    }

    #[test]
    fn test_concurrent_appends_lose_no_updates() {
        let store = KvStore::new();
        let threads = 8;
        let per_thread = 25;

        std::thread::scope(|scope| {
            for t in 0..threads {
                let store = store.clone();
                scope.spawn(move || {
                    for i in 0..per_thread {
                        submit(&store, "Alice", (2024, 1, 1 + i % 28), i64::from(t * 100 + i));
                    }
                });
            }
        });

        let records = store.records_for_player("Alice").expect("records");
        let stats = store.player_stats("Alice").expect("stats").expect("present");
        assert_eq!(records.len(), (threads * per_thread) as usize);
        assert_eq!(*stats.total_games(), records.len() as i64);
        assert_eq!(
            *stats.total_balance(),
            records.iter().map(|r| *r.point_balance()).sum::<i64>()
        );
        assert_eq!(*stats.best_balance(), i64::from((threads - 1) * 100 + per_thread - 1));
        assert_eq!(*stats.worst_balance(), 0);
    }
}

//! Tests for ledger business logic against both storage backends.

use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::NamedTempFile;

use poker_tally::{
    ErrorKind, KvStore, LedgerService, LedgerStore, ProvisionOutcome, RecordSubmission,
    SqliteStore,
};

/// Builds one service per backend. The temp file must outlive the services.
fn services() -> (NamedTempFile, Vec<(&'static str, LedgerService)>) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();
    let sqlite: Arc<dyn LedgerStore> =
        Arc::new(SqliteStore::new(db_path).expect("Failed to create store"));
    let kv: Arc<dyn LedgerStore> = Arc::new(KvStore::new());

    let services = vec![
        ("sqlite", LedgerService::new(sqlite)),
        ("kv", LedgerService::new(kv)),
    ];
    for (_, service) in &services {
        service.provision().expect("Provisioning failed");
    }
    (db_file, services)
}

fn submission(
    name: &str,
    date: &str,
    initial: i64,
    final_points: i64,
    add_ons: i64,
) -> RecordSubmission {
    RecordSubmission {
        player_name: Some(name.to_string()),
        date: Some(date.to_string()),
        initial_points: Some(initial),
        final_points: Some(final_points),
        add_ons: Some(add_ons),
        point_balance: None,
    }
}

#[test]
fn test_alice_two_session_scenario() {
    let (_db, services) = services();
    for (backend, service) in services {
        let first = service
            .submit_record(submission("Alice", "2024-01-01", 20_000, 15_000, 1))
            .expect("First submit failed");
        assert_eq!(*first.point_balance(), -25_000, "{backend}");

        let stats = service.stats("Alice").expect("Stats missing");
        assert_eq!(*stats.total_games(), 1, "{backend}");
        assert_eq!(*stats.total_balance(), -25_000, "{backend}");
        assert_eq!(*stats.average_balance(), -25_000.0, "{backend}");
        assert_eq!(*stats.best_balance(), -25_000, "{backend}");
        assert_eq!(*stats.worst_balance(), -25_000, "{backend}");

        let second = service
            .submit_record(submission("Alice", "2024-01-02", 20_000, 50_000, 0))
            .expect("Second submit failed");
        assert_eq!(*second.point_balance(), 30_000, "{backend}");

        let stats = service.stats("Alice").expect("Stats missing");
        assert_eq!(*stats.total_games(), 2, "{backend}");
        assert_eq!(*stats.total_balance(), 5_000, "{backend}");
        assert!((stats.average_balance() - 2_500.0).abs() < 1e-9, "{backend}");
        assert_eq!(*stats.best_balance(), 30_000, "{backend}");
        assert_eq!(*stats.worst_balance(), -25_000, "{backend}");
    }
}

#[test]
fn test_zero_stake_balance_equals_final_points() {
    let (_db, services) = services();
    for (backend, service) in services {
        let record = service
            .submit_record(submission("Bob", "2024-02-01", 0, 7_777, 0))
            .expect("Submit failed");
        assert_eq!(*record.point_balance(), 7_777, "{backend}");
    }
}

#[test]
fn test_invalid_submission_stores_nothing() {
    let (_db, services) = services();
    for (backend, service) in services {
        let mut bad = submission("Carol", "2024-02-01", 20_000, 10_000, 0);
        bad.add_ons = None;
        let err = service.submit_record(bad).expect_err("Should be rejected");
        assert_eq!(err.kind(), ErrorKind::Validation, "{backend}");
        assert!(service.records("Carol").is_empty(), "{backend}");
        assert!(service.stats("Carol").is_none(), "{backend}");
    }
}

#[test]
fn test_provision_twice_is_harmless() {
    let (_db, services) = services();
    for (backend, service) in services {
        assert_eq!(
            service.provision().expect("Second provision failed"),
            ProvisionOutcome::AlreadyPresent,
            "{backend}"
        );
    }
}

#[test]
fn test_non_positive_default_stake_rejected_and_unchanged() {
    let (_db, services) = services();
    for (backend, service) in services {
        for value in [0, -1, -20_000] {
            let err = service
                .update_default_initial_points(value)
                .expect_err("Should be rejected");
            assert_eq!(err.kind(), ErrorKind::Validation, "{backend}");
        }
        assert_eq!(
            *service.settings().default_initial_points(),
            20_000,
            "{backend}"
        );

        service
            .update_default_initial_points(30_000)
            .expect("Update failed");
        assert_eq!(
            *service.settings().default_initial_points(),
            30_000,
            "{backend}"
        );
    }
}

#[test]
fn test_duplicate_player_conflicts_and_table_unchanged() {
    let (_db, services) = services();
    for (backend, service) in services {
        let original = service.add_player("  Dana ").expect("Add failed");
        assert_eq!(original.name(), "Dana", "{backend}");

        let err = service.add_player("Dana").expect_err("Duplicate should fail");
        assert_eq!(err.kind(), ErrorKind::Conflict, "{backend}");
        assert_eq!(service.players(), vec![original], "{backend}");
    }
}

#[test]
fn test_blank_player_name_and_id_rejected() {
    let (_db, services) = services();
    for (backend, service) in services {
        let err = service.add_player("   ").expect_err("Blank name");
        assert_eq!(err.kind(), ErrorKind::Validation, "{backend}");
        let err = service.delete_player("").expect_err("Blank id");
        assert_eq!(err.kind(), ErrorKind::Validation, "{backend}");
    }
}

#[test]
fn test_settings_list_player_names() {
    let (_db, services) = services();
    for (backend, service) in services {
        service.add_player("Zed").expect("Add failed");
        service.add_player("Amy").expect("Add failed");
        let settings = service.settings();
        assert_eq!(settings.players(), &["Amy", "Zed"], "{backend}");
    }
}

#[test]
fn test_daily_summary_totals_the_day() {
    let (_db, services) = services();
    for (backend, service) in services {
        service
            .submit_record(submission("Alice", "2024-03-01", 20_000, 15_000, 1))
            .expect("Submit failed");
        service
            .submit_record(submission("Bob", "2024-03-01", 20_000, 50_000, 0))
            .expect("Submit failed");
        service
            .submit_record(submission("Bob", "2024-03-02", 20_000, 20_000, 0))
            .expect("Submit failed");

        let day = NaiveDate::from_ymd_opt(2024, 3, 1).expect("Invalid date");
        let summary = service.daily_summary(day);
        assert_eq!(*summary.record_count(), 2, "{backend}");
        assert_eq!(*summary.total_balance(), 5_000, "{backend}");

        let dates = service.dates();
        assert_eq!(dates.len(), 2, "{backend}");
        assert!(dates[0] > dates[1], "{backend}");
    }
}

#[test]
fn test_reads_degrade_on_storage_failure() {
    // Never provisioned, so every query hits a missing table.
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let store = SqliteStore::new(db_file.path().to_str().expect("Invalid path").to_string())
        .expect("Failed to create store");
    let service = LedgerService::new(Arc::new(store));

    assert!(service.records("Alice").is_empty());
    assert!(service.stats("Alice").is_none());
    assert!(service.dates().is_empty());
    assert!(service.players().is_empty());
    assert_eq!(*service.settings().default_initial_points(), 20_000);

    let err = service
        .submit_record(submission("Alice", "2024-01-01", 1, 1, 0))
        .expect_err("Write should fail");
    assert_eq!(err.kind(), ErrorKind::Storage);
}

use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use homelib_server::{
    error::AppError,
    ledger::Ledger,
    models::enums::{LendingStatus, TransactionKind},
    repository::{LedgerStore, SnapshotStore, SqliteStore},
};

use crate::{at, book};

async fn exercise(ledger: &Ledger) {
    ledger
        .add_item(
            "111",
            book("Dune"),
            LendingStatus::CheckedIn,
            "owner",
            at("2024-01-01T09:00:00"),
        )
        .await
        .unwrap();
    ledger
        .add_item(
            "222",
            book("Emma"),
            LendingStatus::CheckedOut,
            "owner",
            at("2024-01-01T09:05:00"),
        )
        .await
        .unwrap();
    ledger
        .check_out("111", "alice", at("2024-01-02T10:00:00"))
        .await
        .unwrap();
    ledger
        .check_in("111", "alice", at("2024-01-03T18:30:00"))
        .await
        .unwrap();
    ledger
        .check_in("222", "bob", at("2024-01-04T08:00:00"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_sqlite_ledger_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("library.db");

    let store = Arc::new(SqliteStore::open_file(&path).await.unwrap());
    let ledger = Ledger::open(store.clone(), false).await.unwrap();
    exercise(&ledger).await;
    let before = ledger.cache().snapshot();
    store.pool().close().await;
    drop(ledger);

    let reopened = Arc::new(SqliteStore::open_file(&path).await.unwrap());
    let ledger = Ledger::open(reopened, false).await.unwrap();
    assert_eq!(ledger.cache().snapshot(), before);

    let history = ledger.history("111").unwrap();
    let kinds: Vec<_> = history.iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        vec![TransactionKind::CheckIn, TransactionKind::CheckOut, TransactionKind::CheckIn]
    );
    assert_eq!(history[1].actor, "alice");
    assert_eq!(history[2].timestamp, at("2024-01-03T18:30:00"));
}

#[tokio::test]
async fn test_sqlite_rejects_duplicate_behind_a_stale_cache() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::open_file(dir.path().join("library.db")).await.unwrap());

    // Two ledgers loaded before either wrote anything
    let first = Ledger::open(store.clone(), false).await.unwrap();
    let second = Ledger::open(store.clone(), false).await.unwrap();

    first
        .add_item(
            "111",
            book("Dune"),
            LendingStatus::CheckedIn,
            "owner",
            at("2024-01-01T09:00:00"),
        )
        .await
        .unwrap();
    let stored = store.load_all().await.unwrap();

    let err = second
        .add_item(
            "111",
            book("Again"),
            LendingStatus::CheckedOut,
            "owner",
            at("2024-02-01T00:00:00"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateItem(_)));
    assert!(second.cache().is_empty());
    assert_eq!(store.load_all().await.unwrap(), stored);
}

#[tokio::test]
async fn test_sqlite_load_repairs_stale_status() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open_file(dir.path().join("library.db")).await.unwrap();

    sqlx::query("INSERT INTO item_info (ISBN, book_name, authors) VALUES ('111', 'Dune', NULL)")
        .execute(store.pool())
        .await
        .unwrap();
    sqlx::query("INSERT INTO item_info (ISBN, book_name) VALUES ('222', 'Emma')")
        .execute(store.pool())
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO transactions (ISBN, transaction_type, transaction_date, user_name) \
         VALUES ('111', 'check in', '2024-01-01 09:00:00', 'owner'), \
                ('111', 'check out', '2024-01-02 10:00:00.123456', NULL)",
    )
    .execute(store.pool())
    .await
    .unwrap();
    // Status row left behind by an interrupted write
    sqlx::query(
        "INSERT INTO book_status (ISBN, status, last_transaction) \
         VALUES ('111', 'checked in', '2024-01-01 09:00:00'), \
                ('222', 'checked out', '2024-01-05 12:00:00')",
    )
    .execute(store.pool())
    .await
    .unwrap();

    let store = Arc::new(store);
    let ledger = Ledger::open(store.clone(), false).await.unwrap();

    let dune = ledger.get("111").unwrap();
    assert_eq!(dune.state.status, LendingStatus::CheckedOut);
    assert_eq!(dune.state.last_transaction, Some(at("2024-01-02T10:00:00")));
    assert_eq!(dune.item.metadata.authors, "");
    assert_eq!(dune.history[1].actor, "");

    // No history: the persisted status stands
    let emma = ledger.get("222").unwrap();
    assert!(emma.history.is_empty());
    assert_eq!(emma.state.status, LendingStatus::CheckedOut);

    // The repair is written back, not only applied to the cache
    let (status, last): (String, String) =
        sqlx::query_as("SELECT status, last_transaction FROM book_status WHERE ISBN = '111'")
            .fetch_one(store.pool())
            .await
            .unwrap();
    assert_eq!(status, "checked out");
    assert_eq!(last, "2024-01-02T10:00:00");
    assert_eq!(store.load_all().await.unwrap().states["111"], dune.state);
}

#[tokio::test]
async fn test_sqlite_opens_database_without_record_ids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("library.db");

    // Layout written by earlier versions: untyped columns, no ids, no keys
    let legacy = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(SqliteConnectOptions::new().filename(&path).create_if_missing(true))
        .await
        .unwrap();
    for statement in [
        "CREATE TABLE item_info (ISBN, book_name, authors, language, publisher, \
         publication_year, genres, acquisition_date, acquisition_location, home_shelf)",
        "CREATE TABLE transactions (ISBN, transaction_type, transaction_date, user_name)",
        "CREATE TABLE book_status (ISBN, status, last_transaction)",
        "INSERT INTO item_info VALUES ('111', 'Dune', 'Frank Herbert', 'English', 'Chilton', \
         1965, 'Science fiction', '2020-05-01', 'Corner shop', 'Study')",
        "INSERT INTO transactions VALUES ('111', 'check in', '2024-01-01T09:00:00', 'owner')",
        "INSERT INTO transactions VALUES ('111', 'check out', '2024-01-02T10:00:00', 'alice')",
        "INSERT INTO book_status VALUES ('111', 'checked out', '2024-01-02T10:00:00')",
    ] {
        sqlx::query(statement).execute(&legacy).await.unwrap();
    }
    legacy.close().await;

    let store = Arc::new(SqliteStore::open_file(&path).await.unwrap());
    let ledger = Ledger::open(store.clone(), false).await.unwrap();

    let dune = ledger.get("111").unwrap();
    assert_eq!(dune.item.metadata.publication_year, "1965");
    assert_eq!(dune.state.status, LendingStatus::CheckedOut);
    let ids: Vec<_> = dune.history.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2]);

    let outcome = ledger
        .check_in("111", "alice", at("2024-01-05T18:00:00"))
        .await
        .unwrap();
    assert_eq!(outcome.record.id, 3);

    // Updated in place: still one status row for the item
    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_status WHERE ISBN = '111'")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(rows, 1);

    store.pool().close().await;
    let reopened = Arc::new(SqliteStore::open_file(&path).await.unwrap());
    let ledger = Ledger::open(reopened, false).await.unwrap();
    assert_eq!(ledger.history("111").unwrap().len(), 3);
    assert_eq!(
        ledger.cache().state("111").unwrap().status,
        LendingStatus::CheckedIn
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sqlite_parallel_commits_on_pooled_connections() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("library.db").display());
    let store = Arc::new(SqliteStore::connect(&url, 4).await.unwrap());
    let ledger = Arc::new(Ledger::open(store.clone(), false).await.unwrap());

    let isbns: Vec<String> = (0..40).map(|i| format!("978{:04}", i)).collect();
    for isbn in &isbns {
        ledger
            .add_item(
                isbn,
                book(isbn),
                LendingStatus::CheckedIn,
                "owner",
                at("2024-01-01T00:00:00"),
            )
            .await
            .unwrap();
    }

    for round in 0..5 {
        let now = at("2024-02-01T00:00:00") + chrono::Duration::minutes(round);
        let mut handles = Vec::new();
        for isbn in isbns.clone() {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.toggle(&isbn, "reader", now).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
    }

    let stored = store.load_all().await.unwrap();
    assert_eq!(stored.transactions.len(), 40 * 6);
    for isbn in &isbns {
        assert_eq!(ledger.history(isbn).unwrap().len(), 6);
        assert_eq!(stored.states[isbn].status, LendingStatus::CheckedOut);
        assert_eq!(ledger.cache().state(isbn).unwrap(), stored.states[isbn]);
    }
}

#[tokio::test]
async fn test_sqlite_failed_status_write_rolls_back_record() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::open_file(dir.path().join("library.db")).await.unwrap());
    let ledger = Ledger::open(store.clone(), false).await.unwrap();
    ledger
        .add_item(
            "111",
            book("Dune"),
            LendingStatus::CheckedIn,
            "owner",
            at("2024-01-01T09:00:00"),
        )
        .await
        .unwrap();

    sqlx::query(
        "CREATE TRIGGER freeze_status BEFORE UPDATE ON book_status \
         BEGIN SELECT RAISE(ABORT, 'status is frozen'); END",
    )
    .execute(store.pool())
    .await
    .unwrap();

    let cached_before = ledger.cache().snapshot();
    let stored_before = store.load_all().await.unwrap();

    let err = ledger
        .toggle("111", "alice", at("2024-01-02T10:00:00"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Persistence(_)));

    // The record inserted before the failing status write is gone too
    let records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(records, 1);
    assert_eq!(store.load_all().await.unwrap(), stored_before);
    assert_eq!(ledger.cache().snapshot(), cached_before);

    sqlx::query("DROP TRIGGER freeze_status")
        .execute(store.pool())
        .await
        .unwrap();
    let outcome = ledger
        .toggle("111", "alice", at("2024-01-02T10:05:00"))
        .await
        .unwrap();
    assert_eq!(outcome.state.status, LendingStatus::CheckedOut);
}

#[tokio::test]
async fn test_sqlite_load_fails_on_orphan_transaction() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open_file(dir.path().join("library.db")).await.unwrap();
    {
        // Foreign keys are enforced by default; a legacy file may not have been
        let mut conn = store.pool().acquire().await.unwrap();
        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(&mut *conn)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO transactions (ISBN, transaction_type, transaction_date) \
             VALUES ('999', 'check in', '2024-01-01 09:00:00')",
        )
        .execute(&mut *conn)
        .await
        .unwrap();
    }

    let err = Ledger::open(Arc::new(store), false).await.err().unwrap();
    assert!(matches!(err, AppError::Persistence(_)));
}

#[tokio::test]
async fn test_snapshot_ledger_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("library.json");

    let store = Arc::new(SnapshotStore::open(&path).await.unwrap());
    let ledger = Ledger::open(store, false).await.unwrap();
    assert!(ledger.cache().is_empty());
    exercise(&ledger).await;
    let before = ledger.cache().snapshot();
    drop(ledger);

    assert!(path.exists());
    let reopened = Arc::new(SnapshotStore::open(&path).await.unwrap());
    let ledger = Ledger::open(reopened, false).await.unwrap();
    assert_eq!(ledger.cache().snapshot(), before);

    // Record ids keep increasing after a reload
    let last = before["111"].history.last().unwrap().id;
    let outcome = ledger
        .toggle("111", "carol", at("2024-02-01T00:00:00"))
        .await
        .unwrap();
    assert!(outcome.record.id > last);
}

#[tokio::test]
async fn test_snapshot_write_failure_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    std::fs::create_dir(&data_dir).unwrap();

    let store = Arc::new(SnapshotStore::open(data_dir.join("library.json")).await.unwrap());
    let ledger = Ledger::open(store.clone(), false).await.unwrap();
    exercise(&ledger).await;

    let cached_before = ledger.cache().snapshot();
    let stored_before = store.load_all().await.unwrap();

    std::fs::remove_dir_all(&data_dir).unwrap();

    let err = ledger
        .toggle("111", "alice", at("2024-02-01T00:00:00"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Persistence(_)));
    assert_eq!(ledger.cache().snapshot(), cached_before);
    assert_eq!(store.load_all().await.unwrap(), stored_before);

    // Once the directory is back the retry goes through
    std::fs::create_dir(&data_dir).unwrap();
    let outcome = ledger
        .toggle("111", "alice", at("2024-02-01T00:01:00"))
        .await
        .unwrap();
    assert_eq!(outcome.state.status, LendingStatus::CheckedOut);
    assert_eq!(ledger.history("111").unwrap().len(), 4);
}

#[tokio::test]
async fn test_snapshot_rejects_unknown_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("library.json");
    std::fs::write(
        &path,
        r#"{"version": 99, "items": [], "transactions": [], "states": {}}"#,
    )
    .unwrap();

    let err = SnapshotStore::open(&path).await.unwrap_err();
    assert!(matches!(err, AppError::Persistence(_)));
}

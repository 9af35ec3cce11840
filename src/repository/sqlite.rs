//! SQLite store using the home library's three-table layout
//!
//! Databases created by earlier versions have no `transactions.id` column and
//! no key on `book_status`. Record ids are read from the implicit `rowid`, and
//! states are written with an update falling back to an insert, so those files
//! load and accept writes unchanged.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use tokio::sync::Mutex;

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{LendingStatus, TransactionKind},
        item::{Item, ItemMetadata},
        transaction::{
            format_timestamp, parse_timestamp, LendingState, PendingRecord, RecordId,
            TransactionRecord,
        },
    },
};

use super::{LedgerSnapshot, LedgerStore};

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS item_info (
        ISBN TEXT PRIMARY KEY NOT NULL,
        book_name TEXT,
        authors TEXT,
        language TEXT,
        publisher TEXT,
        publication_year TEXT,
        genres TEXT,
        acquisition_date TEXT,
        acquisition_location TEXT,
        home_shelf TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS transactions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ISBN TEXT NOT NULL REFERENCES item_info(ISBN),
        transaction_type TEXT NOT NULL,
        transaction_date TEXT NOT NULL,
        user_name TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS book_status (
        ISBN TEXT PRIMARY KEY NOT NULL REFERENCES item_info(ISBN),
        status TEXT NOT NULL,
        last_transaction TEXT
    )
    "#,
];

/// How long a connection waits on a lock held by another process
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Readers share the pool. Writers queue on `writer` first: SQLite admits one
/// writer at a time, and two pooled connections racing to upgrade their locks
/// would fail with `database is locked` instead of waiting.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    writer: Arc<Mutex<()>>,
}

impl SqliteStore {
    /// Connect to `url` (e.g. `sqlite://library.db?mode=rwc`) and create the
    /// tables if they are missing
    pub async fn connect(url: &str, max_connections: u32) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?.busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    /// Open (or create) a database file
    pub async fn open_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: Pool<Sqlite>) -> AppResult<Self> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self {
            pool,
            writer: Arc::new(Mutex::new(())),
        })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

fn unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl LedgerStore for SqliteStore {
    async fn load_all(&self) -> AppResult<LedgerSnapshot> {
        let items = sqlx::query(
            r#"
            SELECT CAST(ISBN AS TEXT) AS isbn,
                   COALESCE(book_name, '') AS book_name,
                   COALESCE(authors, '') AS authors,
                   COALESCE(language, '') AS language,
                   COALESCE(publisher, '') AS publisher,
                   COALESCE(CAST(publication_year AS TEXT), '') AS publication_year,
                   COALESCE(genres, '') AS genres,
                   COALESCE(CAST(acquisition_date AS TEXT), '') AS acquisition_date,
                   COALESCE(acquisition_location, '') AS acquisition_location,
                   COALESCE(home_shelf, '') AS home_shelf
            FROM item_info
            ORDER BY ISBN
            "#,
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| Item {
            isbn: row.get("isbn"),
            metadata: ItemMetadata {
                title: row.get("book_name"),
                authors: row.get("authors"),
                language: row.get("language"),
                publisher: row.get("publisher"),
                publication_year: row.get("publication_year"),
                genres: row.get("genres"),
                acquisition_date: row.get("acquisition_date"),
                acquisition_location: row.get("acquisition_location"),
                home_shelf: row.get("home_shelf"),
            },
        })
        .collect();

        let rows = sqlx::query(
            r#"
            SELECT rowid AS id,
                   CAST(ISBN AS TEXT) AS isbn,
                   COALESCE(transaction_type, '') AS transaction_type,
                   COALESCE(transaction_date, '') AS transaction_date,
                   COALESCE(user_name, '') AS user_name
            FROM transactions
            ORDER BY rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut transactions = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.get("id");
            let kind: String = row.get("transaction_type");
            let kind = TransactionKind::from_db_str(&kind).ok_or_else(|| {
                AppError::Persistence(format!("transaction {} has unknown type '{}'", id, kind))
            })?;
            let date: String = row.get("transaction_date");
            transactions.push(TransactionRecord {
                id,
                isbn: row.get("isbn"),
                kind,
                timestamp: parse_timestamp(&date)?,
                actor: row.get("user_name"),
            });
        }

        let rows = sqlx::query(
            r#"
            SELECT CAST(ISBN AS TEXT) AS isbn,
                   COALESCE(status, '') AS status,
                   last_transaction
            FROM book_status
            ORDER BY rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut states = std::collections::BTreeMap::new();
        for row in rows {
            let isbn: String = row.get("isbn");
            let status: String = row.get("status");
            let status = LendingStatus::from_db_str(&status).ok_or_else(|| {
                AppError::Persistence(format!("item {} has unknown status '{}'", isbn, status))
            })?;
            let last: Option<String> = row.get("last_transaction");
            let last_transaction = match last.as_deref().map(str::trim) {
                Some(value) if !value.is_empty() => Some(parse_timestamp(value)?),
                _ => None,
            };
            states.insert(
                isbn,
                LendingState {
                    status,
                    last_transaction,
                },
            );
        }

        Ok(LedgerSnapshot {
            items,
            transactions,
            states,
        })
    }

    async fn create_item(
        &self,
        item: &Item,
        seed: &PendingRecord,
        state: &LendingState,
    ) -> AppResult<RecordId> {
        let _writer = self.writer.lock().await;
        let mut tx = self.pool.begin().await?;

        let m = &item.metadata;
        sqlx::query(
            r#"
            INSERT INTO item_info (
                ISBN, book_name, authors, language, publisher, publication_year,
                genres, acquisition_date, acquisition_location, home_shelf
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item.isbn)
        .bind(&m.title)
        .bind(&m.authors)
        .bind(&m.language)
        .bind(&m.publisher)
        .bind(&m.publication_year)
        .bind(&m.genres)
        .bind(&m.acquisition_date)
        .bind(&m.acquisition_location)
        .bind(&m.home_shelf)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if unique_violation(&e) {
                AppError::DuplicateItem(item.isbn.clone())
            } else {
                e.into()
            }
        })?;

        let id = insert_record(&mut tx, &item.isbn, seed).await?;
        upsert_state(&mut tx, &item.isbn, state).await?;

        tx.commit().await?;
        Ok(id)
    }

    async fn commit(
        &self,
        isbn: &str,
        record: &PendingRecord,
        state: &LendingState,
    ) -> AppResult<RecordId> {
        let _writer = self.writer.lock().await;
        let mut tx = self.pool.begin().await?;

        let known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM item_info WHERE ISBN = ?")
            .bind(isbn)
            .fetch_one(&mut *tx)
            .await?;
        if known == 0 {
            return Err(AppError::UnknownItem(isbn.to_string()));
        }

        let id = insert_record(&mut tx, isbn, record).await?;
        upsert_state(&mut tx, isbn, state).await?;

        tx.commit().await?;
        Ok(id)
    }

    async fn update_item(&self, item: &Item) -> AppResult<()> {
        let _writer = self.writer.lock().await;
        let m = &item.metadata;
        let result = sqlx::query(
            r#"
            UPDATE item_info
            SET book_name = ?, authors = ?, language = ?, publisher = ?,
                publication_year = ?, genres = ?, acquisition_date = ?,
                acquisition_location = ?, home_shelf = ?
            WHERE ISBN = ?
            "#,
        )
        .bind(&m.title)
        .bind(&m.authors)
        .bind(&m.language)
        .bind(&m.publisher)
        .bind(&m.publication_year)
        .bind(&m.genres)
        .bind(&m.acquisition_date)
        .bind(&m.acquisition_location)
        .bind(&m.home_shelf)
        .bind(&item.isbn)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::UnknownItem(item.isbn.clone()));
        }
        Ok(())
    }

    async fn put_state(&self, isbn: &str, state: &LendingState) -> AppResult<()> {
        let _writer = self.writer.lock().await;
        let mut tx = self.pool.begin().await?;

        let known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM item_info WHERE ISBN = ?")
            .bind(isbn)
            .fetch_one(&mut *tx)
            .await?;
        if known == 0 {
            return Err(AppError::UnknownItem(isbn.to_string()));
        }

        upsert_state(&mut tx, isbn, state).await?;
        tx.commit().await?;
        Ok(())
    }
}

async fn insert_record(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    isbn: &str,
    record: &PendingRecord,
) -> AppResult<RecordId> {
    let result = sqlx::query(
        r#"
        INSERT INTO transactions (ISBN, transaction_type, transaction_date, user_name)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(isbn)
    .bind(record.kind.as_db_str())
    .bind(format_timestamp(&record.timestamp))
    .bind(&record.actor)
    .execute(&mut **tx)
    .await?;
    Ok(result.last_insert_rowid())
}

async fn upsert_state(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    isbn: &str,
    state: &LendingState,
) -> AppResult<()> {
    let status = state.status.as_db_str();
    let last_transaction = state.last_transaction.as_ref().map(format_timestamp);

    let updated =
        sqlx::query("UPDATE book_status SET status = ?, last_transaction = ? WHERE ISBN = ?")
            .bind(status)
            .bind(&last_transaction)
            .bind(isbn)
            .execute(&mut **tx)
            .await?;

    if updated.rows_affected() == 0 {
        sqlx::query("INSERT INTO book_status (ISBN, status, last_transaction) VALUES (?, ?, ?)")
            .bind(isbn)
            .bind(status)
            .bind(&last_transaction)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

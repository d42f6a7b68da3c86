//! Database abstraction over SQLite via sqlx.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use sqlx::{
    pool::PoolConnection,
    sqlite::{Sqlite, SqliteConnectOptions, SqliteJournalMode, SqlitePool},
    Transaction,
};

use crate::error::StoreError;

/// Boxed future returned by the scoped transaction closures.
pub type TxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Central store handle. Cheap to clone (Arc internally).
///
/// All mutation operations on the message entity expect a caller-held write
/// transaction; the store hands those out but takes no locks of its own.
/// Isolation is SQLite's job (WAL, single writer).
#[derive(Clone)]
pub struct Store {
    pub pool: SqlitePool,
}

impl Store {
    /// Open (or create) the SQLite database at `db_path`.
    /// Runs all pending migrations automatically.
    ///
    /// WAL journal mode and foreign-key enforcement are configured at
    /// connection time here, NOT inside a migration: SQLite forbids changing
    /// `journal_mode` inside a transaction and sqlx wraps every migration
    /// in one.
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(opts).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Begin a write transaction. The caller owns commit/rollback.
    pub async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>, StoreError> {
        Ok(self.pool.begin().await?)
    }

    /// Pooled connection for read accessors that resolve attachments.
    pub async fn read_conn(&self) -> Result<PoolConnection<Sqlite>, StoreError> {
        Ok(self.pool.acquire().await?)
    }

    /// Run `f` inside a write transaction: committed if `f` succeeds,
    /// rolled back if it fails.
    pub async fn with_write<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: for<'t> FnOnce(&'t mut sqlx::SqliteConnection) -> TxFuture<'t, T>,
    {
        let mut tx = self.pool.begin().await?;
        match f(&mut *tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(e) => {
                let _ = tx.rollback().await;
                Err(e)
            }
        }
    }

    /// Run `f` against a snapshot read transaction.
    pub async fn with_read<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: for<'t> FnOnce(&'t mut sqlx::SqliteConnection) -> TxFuture<'t, T>,
    {
        let mut tx = self.pool.begin().await?;
        let result = f(&mut *tx).await;
        // Read-only scope: nothing to persist either way.
        let _ = tx.rollback().await;
        result
    }
}

use crate::errors::DbResult;
use crate::store::{execute_statement, WriteBatch};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 20;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection pool to the SQLite file backing every entity table.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Self::open_with(path, DEFAULT_MAX_CONNECTIONS).await
    }

    pub async fn open_with<P: AsRef<Path>>(path: P, max_connections: u32) -> DbResult<Self> {
        let path = path.as_ref();

        // Ensure the database directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // WAL lets the query service read while the scanner writes.
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await?;

        tracing::debug!(path = %path.display(), max_connections, "opened database");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run a batch of `;`-separated statements, e.g. a schema file.
    pub async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        sqlx::query(sql).execute(&self.pool).await?;
        Ok(())
    }

    pub fn batch(&self) -> WriteBatch {
        WriteBatch::new()
    }

    /// Apply every statement in `batch` inside one transaction. On error nothing is written.
    pub async fn write_batch(&self, batch: WriteBatch) -> DbResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for statement in batch.statements() {
            execute_statement(&mut *tx, statement).await?;
        }
        tx.commit().await?;

        tracing::trace!(statements = batch.len(), "batch written");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

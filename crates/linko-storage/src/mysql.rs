use async_trait::async_trait;
use jiff::Timestamp;
use linko_core::error::StorageError;
use linko_core::repository::{NewUrlRecord, Repository, Result, UrlRecord};
use linko_core::retry::{retry, RetryPolicy};
use linko_core::shortcode::ShortCode;
use sqlx::mysql::{MySqlPoolOptions, MySqlRow};
use sqlx::{MySqlPool, Row};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, trace};

/// Default bound on every query.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Schema of the `short_urls` table.
pub const SCHEMA: &str = include_str!("../ddl/mysql/short_urls.sql");

/// MySQL implementation of the repository contract.
///
/// Timestamps are stored as unix seconds. `short_code` uses a binary
/// collation so codes differing only in case stay distinct.
#[derive(Debug, Clone)]
pub struct MySqlRepository {
    pool: MySqlPool,
    timeout: Duration,
}

impl MySqlRepository {
    /// Creates a repository from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self::with_timeout(pool, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(pool: MySqlPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Opens a new MySQL connection pool.
    pub async fn connect(database_url: &str, timeout: Duration) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .acquire_timeout(timeout)
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::with_timeout(pool, timeout))
    }

    /// Opens a pool, retrying while the server is not reachable yet.
    pub async fn connect_with_retry(
        database_url: &str,
        timeout: Duration,
        policy: &RetryPolicy,
    ) -> Result<Self> {
        retry(
            policy,
            "mysql connect",
            |_| Self::connect(database_url, timeout),
            StorageError::is_transient,
        )
        .await
        .map_err(|e| e.source)
    }

    /// Creates the `short_urls` table if it does not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        self.bounded("migrate", sqlx::query(SCHEMA).execute(&self.pool))
            .await?
            .map_err(map_sqlx_error)?;
        info!("short_urls schema is in place");
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Runs `fut` under the query timeout.
    ///
    /// Driver errors are passed through untouched so callers can inspect
    /// them before mapping.
    async fn bounded<T, F>(
        &self,
        operation: &str,
        fut: F,
    ) -> Result<std::result::Result<T, sqlx::Error>>
    where
        F: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| StorageError::Timeout(format!("{operation} exceeded {:?}", self.timeout)))
    }
}

fn parse_timestamp(column: &str, seconds: i64) -> Result<Timestamp> {
    Timestamp::from_second(seconds).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{seconds}': {e}"))
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

fn record_from_row(row: &MySqlRow) -> Result<UrlRecord> {
    let id: u64 = row.try_get("id").map_err(map_sqlx_error)?;
    let short_code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
    let original_url: String = row.try_get("original_url").map_err(map_sqlx_error)?;
    let hit_count: u64 = row.try_get("hit_count").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let updated_at: i64 = row.try_get("updated_at").map_err(map_sqlx_error)?;

    Ok(UrlRecord {
        id,
        short_code: ShortCode::new_unchecked(short_code),
        original_url,
        hit_count,
        created_at: parse_timestamp("created_at", created_at)?,
        updated_at: parse_timestamp("updated_at", updated_at)?,
    })
}

#[async_trait]
impl Repository for MySqlRepository {
    async fn insert(&self, record: &NewUrlRecord) -> Result<u64> {
        let now = Timestamp::now().as_second();
        trace!(code = %record.short_code, "Inserting short url");

        let result = self
            .bounded(
                "insert",
                sqlx::query(
                    r#"
                    INSERT INTO short_urls (short_code, original_url, hit_count, created_at, updated_at)
                    VALUES (?, ?, 0, ?, ?)
                    "#,
                )
                .bind(record.short_code.as_str())
                .bind(record.original_url.as_str())
                .bind(now)
                .bind(now)
                .execute(&self.pool),
            )
            .await?;

        match result {
            Ok(done) => {
                debug!(code = %record.short_code, id = done.last_insert_id(), "Inserted short url");
                Ok(done.last_insert_id())
            }
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::Conflict(record.short_code.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn lookup(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        let row = self
            .bounded(
                "lookup",
                sqlx::query(
                    r#"
                    SELECT id, short_code, original_url, hit_count, created_at, updated_at
                    FROM short_urls
                    WHERE short_code = ?
                    LIMIT 1
                    "#,
                )
                .bind(code.as_str())
                .fetch_optional(&self.pool),
            )
            .await?
            .map_err(map_sqlx_error)?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn increment_hit_count(&self, code: &ShortCode) -> Result<()> {
        let now = Timestamp::now().as_second();

        let result = self
            .bounded(
                "increment_hit_count",
                sqlx::query(
                    r#"
                    UPDATE short_urls
                    SET hit_count = hit_count + 1, updated_at = ?
                    WHERE short_code = ?
                    "#,
                )
                .bind(now)
                .bind(code.as_str())
                .execute(&self.pool),
            )
            .await?
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(code.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_are_classified() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            StorageError::Timeout(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolClosed),
            StorageError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            StorageError::InvalidData(_)
        ));
    }

    #[test]
    fn schema_has_unique_short_code() {
        assert!(SCHEMA.contains("UNIQUE KEY uk_short_urls_short_code (short_code)"));
        assert!(SCHEMA.contains("utf8mb4_bin"));
    }
}

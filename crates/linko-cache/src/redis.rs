use async_trait::async_trait;
use linko_core::cache::{CacheStore, Result};
use linko_core::CacheError;
use redis::AsyncCommands;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Default bound on every Redis round trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// A Redis-backed [`CacheStore`].
///
/// Every command runs on a shared multiplexed connection and is bounded by
/// `timeout`; an elapsed timeout is reported as [`CacheError::Timeout`].
#[derive(Debug, Clone)]
pub struct RedisCacheStore {
    conn: redis::aio::MultiplexedConnection,
    timeout: Duration,
}

pub(crate) fn map_redis_error(operation: &str, err: redis::RedisError) -> CacheError {
    let message = format!("{operation}: {err}");
    if err.is_timeout() || message.to_ascii_lowercase().contains("timed out") {
        CacheError::Timeout(message)
    } else if err.is_io_error() {
        CacheError::Unavailable(message)
    } else {
        CacheError::Operation(message)
    }
}

impl RedisCacheStore {
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self::with_timeout(conn, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(conn: redis::aio::MultiplexedConnection, timeout: Duration) -> Self {
        Self { conn, timeout }
    }

    /// Opens a multiplexed connection to `url` (e.g. `redis://127.0.0.1:6379`).
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| CacheError::Initialization(format!("invalid redis url: {e}")))?;

        let conn = tokio::time::timeout(timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| CacheError::Timeout(format!("connecting to redis at {url}")))?
            .map_err(|e| map_redis_error("failed to connect to Redis", e))?;

        debug!(url, "Connected to Redis");
        Ok(Self::with_timeout(conn, timeout))
    }

    async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(operation, error = %e, "Redis command failed");
                Err(map_redis_error(operation, e))
            }
            Err(_) => {
                warn!(operation, timeout = ?self.timeout, "Redis command timed out");
                Err(CacheError::Timeout(format!(
                    "{operation} exceeded {:?}",
                    self.timeout
                )))
            }
        }
    }
}

fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        trace!(key, "GET");
        let mut conn = self.conn.clone();
        self.bounded("GET", conn.get::<_, Option<String>>(key)).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        trace!(key, ?ttl, "SET EX");
        let mut conn = self.conn.clone();
        self.bounded("SET", conn.set_ex::<_, _, ()>(key, value, ttl_seconds(ttl)))
            .await
    }

    async fn hash_set(&self, key: &str, fields: &[(&str, &str)], ttl: Duration) -> Result<()> {
        trace!(key, fields = fields.len(), ?ttl, "HSET + EXPIRE");
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic()
            .hset_multiple(key, fields)
            .ignore()
            .expire(key, ttl_seconds(ttl) as i64)
            .ignore();

        self.bounded("HSET", pipe.query_async::<()>(&mut conn)).await
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>> {
        trace!(key, field, "HGET");
        let mut conn = self.conn.clone();
        self.bounded("HGET", conn.hget::<_, _, Option<String>>(key, field))
            .await
    }

    async fn increment(&self, key: &str) -> Result<u64> {
        trace!(key, "INCR");
        let mut conn = self.conn.clone();
        let value: i64 = self.bounded("INCR", conn.incr::<_, _, i64>(key, 1)).await?;
        u64::try_from(value)
            .map_err(|_| CacheError::InvalidData(format!("counter {key} is negative: {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_second_ttl_rounds_up() {
        assert_eq!(ttl_seconds(Duration::from_millis(10)), 1);
        assert_eq!(ttl_seconds(Duration::from_secs(86_400)), 86_400);
    }
}

use crate::error::CacheError;
use async_trait::async_trait;
use std::time::Duration;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Hash field holding the original URL of a cached entry.
pub const URL_FIELD: &str = "url";
/// Hash field holding the persisted flag of a cached entry.
pub const PERSISTED_FIELD: &str = "persisted";

/// A key-value cache store.
///
/// This is the only surface the pipelines use to talk to the cache. Every
/// call is side-effecting against shared state and failures are returned to
/// the caller; retry policy is decided above this layer.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Get a string value. Returns `Ok(None)` on a miss.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a string value that expires after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Write all `fields` under `key` atomically, then reset the TTL of the
    /// whole key to `ttl`.
    async fn hash_set(&self, key: &str, fields: &[(&str, &str)], ttl: Duration) -> Result<()>;

    /// Get one hash field. Returns `Ok(None)` if the key or field is missing.
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>>;

    /// Atomically increment a counter and return the new value.
    ///
    /// A missing counter starts at zero, so the first call returns 1.
    async fn increment(&self, key: &str) -> Result<u64>;
}

/// A cached URL mapping.
///
/// `persisted == false` marks a cache-ahead entry whose durable row may
/// not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedUrlEntry {
    pub url: String,
    pub persisted: bool,
}

impl CachedUrlEntry {
    /// An entry written before the durable row exists.
    pub fn pending(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            persisted: false,
        }
    }

    /// An entry backed by a durable row.
    pub fn persisted(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            persisted: true,
        }
    }

    /// Hash fields as stored in the cache (`persisted` is `"0"` or `"1"`).
    pub fn to_fields(&self) -> [(&'static str, &str); 2] {
        let flag = if self.persisted { "1" } else { "0" };
        [(URL_FIELD, self.url.as_str()), (PERSISTED_FIELD, flag)]
    }

    /// Rebuilds an entry from its stored fields.
    pub fn from_fields(url: String, persisted: Option<&str>) -> Result<Self> {
        let persisted = match persisted {
            Some("1") => true,
            Some("0") | None => false,
            Some(other) => {
                return Err(CacheError::InvalidData(format!(
                    "persisted flag must be \"0\" or \"1\", got {other:?}"
                )))
            }
        };
        Ok(Self { url, persisted })
    }
}

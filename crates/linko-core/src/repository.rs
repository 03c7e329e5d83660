use crate::error::StorageError;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A durable short URL row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// Identity assigned by the store.
    pub id: u64,
    /// Unique, immutable once created.
    pub short_code: ShortCode,
    /// The original URL that was shortened.
    pub original_url: String,
    /// Number of resolved redirects.
    pub hit_count: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row to insert; the store assigns the id, counters and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUrlRecord {
    pub short_code: ShortCode,
    pub original_url: String,
}

impl NewUrlRecord {
    pub fn new(short_code: ShortCode, original_url: impl Into<String>) -> Self {
        Self {
            short_code,
            original_url: original_url.into(),
        }
    }
}

/// Durable storage for short URL rows.
///
/// Implementations bound every call with a timeout and report it as
/// [`StorageError::Timeout`].
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    /// Inserts a new row and returns its id.
    ///
    /// Returns `Err(Conflict)` if the short code already exists.
    async fn insert(&self, record: &NewUrlRecord) -> Result<u64>;

    /// Retrieves the row for a given short code.
    /// Returns `None` if the code does not exist.
    async fn lookup(&self, code: &ShortCode) -> Result<Option<UrlRecord>>;

    /// Increments `hit_count` by one and refreshes `updated_at`.
    ///
    /// Returns `Err(NotFound)` if no row matches.
    async fn increment_hit_count(&self, code: &ShortCode) -> Result<()>;
}

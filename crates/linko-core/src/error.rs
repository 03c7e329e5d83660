use thiserror::Error;

/// Result type for validation of domain values.
pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation timed out: {0}")]
    Timeout(String),
    #[error("cache serialization failed: {0}")]
    Serialization(String),
    #[error("cache value is invalid: {0}")]
    InvalidData(String),
    #[error("cache initialization failed: {0}")]
    Initialization(String),
    #[error("cache operation failed: {0}")]
    Operation(String),
}

impl CacheError {
    /// Whether retrying the same operation later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, CacheError::Unavailable(_) | CacheError::Timeout(_))
    }
}

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("short code already exists: {0}")]
    Conflict(String),
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl StorageError {
    /// Whether retrying the same operation later could succeed.
    ///
    /// `NotFound` counts as transient: a row written behind the cache may
    /// still be in flight.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StorageError::Unavailable(_)
                | StorageError::Timeout(_)
                | StorageError::Query(_)
                | StorageError::NotFound(_)
        )
    }
}

/// Validation failures for client-supplied values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
    #[error("invalid code length bounds: {0}")]
    InvalidCodeLength(String),
}

impl CoreError {
    /// The message meant for the client, without the error class prefix.
    pub fn message(&self) -> &str {
        match self {
            CoreError::InvalidUrl(message)
            | CoreError::InvalidShortCode(message)
            | CoreError::InvalidCodeLength(message) => message,
        }
    }
}

/// Errors surfaced by the shortening and redirect pipelines.
#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    #[error(transparent)]
    Validation(#[from] CoreError),
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("persist queue is closed")]
    QueueClosed,
}

impl ShortenerError {
    pub fn is_transient(&self) -> bool {
        match self {
            ShortenerError::Cache(e) => e.is_transient(),
            ShortenerError::Storage(e) => e.is_transient(),
            ShortenerError::Validation(_)
            | ShortenerError::NotFound(_)
            | ShortenerError::QueueClosed => false,
        }
    }
}

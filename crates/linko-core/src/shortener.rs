use crate::error::ShortenerError;
use crate::shortcode::ShortCode;
use crate::stats::StatsSnapshot;
use async_trait::async_trait;

type Result<T> = std::result::Result<T, ShortenerError>;

/// The outcome of shortening a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortenedUrl {
    pub code: ShortCode,
    pub short_url: String,
}

/// The write path.
#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Issues a short code for `original_url`.
    ///
    /// Returns once the code is resolvable through the cache; durable
    /// persistence completes in the background.
    async fn shorten(&self, original_url: &str) -> Result<ShortenedUrl>;
}

/// The read path.
#[async_trait]
pub trait Redirector: Send + Sync + 'static {
    /// Resolves a short code to its original URL and records the hit.
    async fn resolve(&self, code: &ShortCode) -> Result<String>;

    /// Returns the (possibly cached) counters for a short code.
    async fn stats(&self, code: &ShortCode) -> Result<StatsSnapshot>;
}

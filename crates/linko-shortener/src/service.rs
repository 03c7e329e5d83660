use crate::queue::{PendingPersistTask, PersistQueue};
use async_trait::async_trait;
use linko_cache::UrlCache;
use linko_core::cache::CacheStore;
use linko_core::{
    validate_original_url, CachedUrlEntry, ShortenedUrl, Shortener, ShortenerError,
};
use linko_generator::Generator;
use std::sync::Arc;
use tracing::{debug, trace};

/// The write path.
///
/// A code is reserved, the cache-ahead entry (`persisted = "0"`) is written
/// and the durable insert is queued for the write-behind worker. The call
/// returns as soon as the code resolves through the cache. Nothing in here
/// is retried.
pub struct ShortenerService<G, S> {
    generator: Arc<G>,
    cache: UrlCache<S>,
    queue: PersistQueue,
    base_url: String,
}

impl<G: Generator, S: CacheStore> ShortenerService<G, S> {
    pub fn new(
        generator: Arc<G>,
        cache: UrlCache<S>,
        queue: PersistQueue,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            cache,
            queue,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl<G: Generator, S: CacheStore> Shortener for ShortenerService<G, S> {
    async fn shorten(&self, original_url: &str) -> Result<ShortenedUrl, ShortenerError> {
        let original_url = original_url.trim();
        validate_original_url(original_url)?;

        let code = self.generator.next_code().await?;
        trace!(code = %code, "Writing cache-ahead entry");

        self.cache
            .put_entry(&code, &CachedUrlEntry::pending(original_url))
            .await?;

        self.queue
            .enqueue(PendingPersistTask {
                code: code.clone(),
                original_url: original_url.to_string(),
            })
            .await?;

        debug!(code = %code, "Short url issued");
        Ok(ShortenedUrl {
            short_url: code.to_url(&self.base_url),
            code,
        })
    }
}

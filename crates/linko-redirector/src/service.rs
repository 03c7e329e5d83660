use std::sync::Arc;

use crate::hits::HitCounter;
use async_trait::async_trait;
use linko_cache::UrlCache;
use linko_core::cache::CacheStore;
use linko_core::retry::RetryPolicy;
use linko_core::{
    BackgroundTasks, CachedUrlEntry, Redirector, Repository, ShortCode, ShortenerError,
    StatsSnapshot,
};
use tracing::{debug, trace, warn};

/// Service for handling URL redirects.
///
/// Reads go cache first and fall back to the durable store. A durable hit
/// is written back to the cache in the background with `persisted = "1"`.
/// Every resolution records one hit.
pub struct RedirectorService<R, S> {
    repository: Arc<R>,
    cache: UrlCache<S>,
    hits: HitCounter<R>,
    tasks: BackgroundTasks,
}

impl<R: Repository, S: CacheStore> RedirectorService<R, S> {
    pub fn new(
        repository: Arc<R>,
        cache: UrlCache<S>,
        tasks: BackgroundTasks,
        hit_policy: RetryPolicy,
    ) -> Self {
        let hits = HitCounter::new(Arc::clone(&repository), tasks.clone(), hit_policy);
        Self {
            repository,
            cache,
            hits,
            tasks,
        }
    }

    /// Writes the durable mapping back to the cache without waiting.
    fn repopulate(&self, code: &ShortCode, original_url: &str) {
        let cache = self.cache.clone();
        let code = code.clone();
        let entry = CachedUrlEntry::persisted(original_url);

        self.tasks.spawn("cache repopulate", async move {
            match cache.put_entry(&code, &entry).await {
                Ok(()) => trace!(code = %code, "Repopulated cache"),
                Err(e) => warn!(code = %code, error = %e, "Failed to repopulate cache"),
            }
        });
    }
}

#[async_trait]
impl<R: Repository, S: CacheStore> Redirector for RedirectorService<R, S> {
    async fn resolve(&self, code: &ShortCode) -> Result<String, ShortenerError> {
        trace!(code = %code, "resolving short code");

        match self.cache.url(code).await {
            Ok(Some(url)) => {
                self.hits.record(code.clone());
                return Ok(url);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(code = %code, error = %e, "Cache read failed, falling back to store");
            }
        }

        let Some(record) = self.repository.lookup(code).await? else {
            trace!(code = %code, "Short code not found");
            return Err(ShortenerError::NotFound(code.to_string()));
        };

        debug!(code = %code, "Resolved short code from store");
        self.repopulate(code, &record.original_url);
        self.hits.record(code.clone());
        Ok(record.original_url)
    }

    async fn stats(&self, code: &ShortCode) -> Result<StatsSnapshot, ShortenerError> {
        match self.cache.stats(code).await {
            Ok(Some(snapshot)) => return Ok(snapshot),
            Ok(None) => {}
            Err(e) => warn!(code = %code, error = %e, "Stats cache read failed"),
        }

        let record = self
            .repository
            .lookup(code)
            .await?
            .ok_or_else(|| ShortenerError::NotFound(code.to_string()))?;

        let snapshot = StatsSnapshot::from(record);
        if let Err(e) = self.cache.put_stats(code, &snapshot).await {
            warn!(code = %code, error = %e, "Failed to cache stats");
        }
        Ok(snapshot)
    }
}

use linko_core::cache::{CacheStore, Result, PERSISTED_FIELD, URL_FIELD};
use linko_core::{CacheError, CachedUrlEntry, ShortCode, StatsSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};
use typed_builder::TypedBuilder;

/// Key namespaces and TTLs for URL data in the cache.
#[derive(Debug, Clone, TypedBuilder)]
pub struct UrlCacheSettings {
    #[builder(default = "lk:url:".to_string(), setter(into))]
    pub url_prefix: String,
    #[builder(default = "lk:stats:".to_string(), setter(into))]
    pub stats_prefix: String,
    #[builder(default = Duration::from_secs(24 * 60 * 60))]
    pub entry_ttl: Duration,
    #[builder(default = Duration::from_secs(60))]
    pub stats_ttl: Duration,
}

impl Default for UrlCacheSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// URL mappings and stats snapshots on top of a [`CacheStore`].
pub struct UrlCache<S> {
    store: Arc<S>,
    settings: UrlCacheSettings,
}

impl<S> Clone for UrlCache<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            settings: self.settings.clone(),
        }
    }
}

impl<S: CacheStore> UrlCache<S> {
    pub fn new(store: Arc<S>, settings: UrlCacheSettings) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn url_key(&self, code: &ShortCode) -> String {
        format!("{}{}", self.settings.url_prefix, code.as_str())
    }

    fn stats_key(&self, code: &ShortCode) -> String {
        format!("{}{}", self.settings.stats_prefix, code.as_str())
    }

    /// The original URL cached for `code`, if any.
    pub async fn url(&self, code: &ShortCode) -> Result<Option<String>> {
        trace!(code = %code, "Fetching URL from cache");
        let url = self.store.hash_get(&self.url_key(code), URL_FIELD).await?;
        match &url {
            Some(_) => debug!(code = %code, "Cache hit"),
            None => trace!(code = %code, "Cache miss"),
        }
        Ok(url)
    }

    /// The full cached entry for `code`, including its persisted flag.
    pub async fn entry(&self, code: &ShortCode) -> Result<Option<CachedUrlEntry>> {
        let key = self.url_key(code);
        let Some(url) = self.store.hash_get(&key, URL_FIELD).await? else {
            return Ok(None);
        };
        let persisted = self.store.hash_get(&key, PERSISTED_FIELD).await?;
        CachedUrlEntry::from_fields(url, persisted.as_deref()).map(Some)
    }

    /// Writes `entry` and resets its TTL.
    pub async fn put_entry(&self, code: &ShortCode, entry: &CachedUrlEntry) -> Result<()> {
        trace!(code = %code, persisted = entry.persisted, "Caching URL entry");
        self.store
            .hash_set(&self.url_key(code), &entry.to_fields(), self.settings.entry_ttl)
            .await
    }

    /// The cached stats snapshot for `code`, if any.
    pub async fn stats(&self, code: &ShortCode) -> Result<Option<StatsSnapshot>> {
        let Some(raw) = self.store.get(&self.stats_key(code)).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!(code = %code, error = %e, "Failed to deserialize cached stats");
                Err(CacheError::InvalidData(format!(
                    "invalid cached stats for {code}: {e}"
                )))
            }
        }
    }

    pub async fn put_stats(&self, code: &ShortCode, snapshot: &StatsSnapshot) -> Result<()> {
        let json = serde_json::to_string(snapshot).map_err(|e| {
            CacheError::Serialization(format!("failed to serialize stats for {code}: {e}"))
        })?;
        self.store
            .set(&self.stats_key(code), &json, self.settings.stats_ttl)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryCacheStore;
    use jiff::Timestamp;

    fn cache() -> UrlCache<MemoryCacheStore> {
        UrlCache::new(Arc::new(MemoryCacheStore::new()), UrlCacheSettings::default())
    }

    fn code() -> ShortCode {
        ShortCode::new("abc1234").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn entry_round_trip() {
        let cache = cache();
        assert_eq!(cache.url(&code()).await.unwrap(), None);

        cache
            .put_entry(&code(), &CachedUrlEntry::pending("https://example.com/a"))
            .await
            .unwrap();

        assert_eq!(
            cache.url(&code()).await.unwrap().as_deref(),
            Some("https://example.com/a")
        );
        let entry = cache.entry(&code()).await.unwrap().unwrap();
        assert!(!entry.persisted);
        assert_eq!(
            cache.store().ttl("lk:url:abc1234"),
            Some(Duration::from_secs(86_400))
        );
    }

    #[tokio::test]
    async fn promotion_flips_persisted_flag() {
        let cache = cache();
        cache
            .put_entry(&code(), &CachedUrlEntry::pending("https://example.com/a"))
            .await
            .unwrap();
        cache
            .put_entry(&code(), &CachedUrlEntry::persisted("https://example.com/a"))
            .await
            .unwrap();

        assert!(cache.entry(&code()).await.unwrap().unwrap().persisted);
    }

    #[tokio::test(start_paused = true)]
    async fn stats_use_their_own_namespace_and_ttl() {
        let cache = cache();
        let snapshot = StatsSnapshot {
            code: code(),
            hit_count: 3,
            created_at: Timestamp::from_second(1_700_000_000).unwrap(),
            updated_at: Timestamp::from_second(1_700_000_100).unwrap(),
            original_url: "https://example.com/a".to_string(),
        };

        cache.put_stats(&code(), &snapshot).await.unwrap();
        assert_eq!(cache.stats(&code()).await.unwrap(), Some(snapshot));
        assert_eq!(cache.url(&code()).await.unwrap(), None);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.stats(&code()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_stats_are_invalid_data() {
        let cache = cache();
        cache
            .store()
            .set("lk:stats:abc1234", "{not json", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(matches!(
            cache.stats(&code()).await,
            Err(CacheError::InvalidData(_))
        ));
    }
}

pub mod hash;

pub use hash::hash_to_base62;

use async_trait::async_trait;
use linko_core::cache::CacheStore;
use linko_core::{CacheError, CodeLength, ShortCode};
use std::sync::Arc;
use tracing::trace;
use typed_builder::TypedBuilder;

/// Trait for generating short codes.
///
/// Every call reserves a fresh code; a failed reservation issues no code.
#[async_trait]
pub trait Generator: Send + Sync + 'static {
    async fn next_code(&self) -> Result<ShortCode, CacheError>;
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct CounterSettings {
    /// Cache key of the global counter. Never reset.
    #[builder(default = "url_counter".to_string(), setter(into))]
    counter_key: String,
    #[builder(default)]
    length: CodeLength,
}

impl Default for CounterSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Generates codes by hashing values of an atomic counter in the cache.
///
/// The same counter value always yields the same code, so uniqueness rests
/// on the counter never repeating.
pub struct CounterHashGenerator<S> {
    store: Arc<S>,
    settings: CounterSettings,
}

impl<S: CacheStore> CounterHashGenerator<S> {
    pub fn new(store: Arc<S>, settings: CounterSettings) -> Self {
        Self { store, settings }
    }
}

#[async_trait]
impl<S: CacheStore> Generator for CounterHashGenerator<S> {
    async fn next_code(&self) -> Result<ShortCode, CacheError> {
        let counter = self.store.increment(&self.settings.counter_key).await?;
        let code = hash_to_base62(counter, self.settings.length);
        trace!(counter, code = %code, "Reserved short code");
        Ok(ShortCode::new_unchecked(code))
    }
}

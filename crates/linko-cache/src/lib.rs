//! Cache stores and the URL cache policy shared across Linko services.

pub mod memory;
pub mod redis;
pub mod url_cache;

pub use memory::{spawn_sweeper, MemoryCacheStore};
pub use redis::RedisCacheStore;
pub use url_cache::{UrlCache, UrlCacheSettings};

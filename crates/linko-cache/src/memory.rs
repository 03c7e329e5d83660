use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use linko_core::cache::{CacheStore, Result};
use linko_core::CacheError;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// Default period of the expired-key sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Hash(HashMap<String, String>),
}

#[derive(Debug, Clone)]
struct Slot {
    value: Value,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

fn wrong_type(key: &str) -> CacheError {
    CacheError::InvalidData(format!("key {key} holds the wrong kind of value"))
}

/// An in-process [`CacheStore`] with Redis-like semantics.
///
/// Expired keys are removed lazily on access and by [`spawn_sweeper`].
/// Expiry follows the tokio clock, so paused-time tests can advance past a
/// TTL.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    slots: DashMap<String, Slot>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.slots.iter().filter(|s| !s.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining time to live of `key`, if it exists and expires.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let slot = self.slots.get(key)?;
        if slot.is_expired(now) {
            return None;
        }
        slot.expires_at.map(|at| at - now)
    }

    /// Drops every expired key and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.slots.retain(|_, slot| {
            let keep = !slot.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    fn live_entry(&self, key: &str) -> Entry<'_, String, Slot> {
        let now = Instant::now();
        match self.slots.entry(key.to_string()) {
            Entry::Occupied(occupied) if occupied.get().is_expired(now) => {
                trace!(key, "expired");
                occupied.remove();
                self.slots.entry(key.to_string())
            }
            entry => entry,
        }
    }
}

/// Purges expired keys of `store` every `period`.
///
/// The task holds only a weak reference and ends once the store is dropped.
pub fn spawn_sweeper(store: &Arc<MemoryCacheStore>, period: Duration) -> JoinHandle<()> {
    let store: Weak<MemoryCacheStore> = Arc::downgrade(store);
    let period = period.max(Duration::from_millis(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(store) = store.upgrade() else {
                debug!("memory cache dropped, stopping sweeper");
                return;
            };
            let removed = store.purge_expired();
            if removed > 0 {
                debug!(removed, remaining = store.slots.len(), "swept expired keys");
            }
        }
    })
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.live_entry(key) {
            Entry::Occupied(slot) => match &slot.get().value {
                Value::Str(value) => Ok(Some(value.clone())),
                Value::Hash(_) => Err(wrong_type(key)),
            },
            Entry::Vacant(_) => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.slots.insert(
            key.to_string(),
            Slot {
                value: Value::Str(value.to_string()),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn hash_set(&self, key: &str, fields: &[(&str, &str)], ttl: Duration) -> Result<()> {
        let expires_at = Some(Instant::now() + ttl);
        match self.live_entry(key) {
            Entry::Occupied(mut slot) => {
                let slot = slot.get_mut();
                let Value::Hash(map) = &mut slot.value else {
                    return Err(wrong_type(key));
                };
                for (field, value) in fields {
                    map.insert(field.to_string(), value.to_string());
                }
                slot.expires_at = expires_at;
            }
            Entry::Vacant(vacant) => {
                let map = fields
                    .iter()
                    .map(|(field, value)| (field.to_string(), value.to_string()))
                    .collect();
                vacant.insert(Slot {
                    value: Value::Hash(map),
                    expires_at,
                });
            }
        }
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>> {
        match self.live_entry(key) {
            Entry::Occupied(slot) => match &slot.get().value {
                Value::Hash(map) => Ok(map.get(field).cloned()),
                Value::Str(_) => Err(wrong_type(key)),
            },
            Entry::Vacant(_) => Ok(None),
        }
    }

    async fn increment(&self, key: &str) -> Result<u64> {
        match self.live_entry(key) {
            Entry::Occupied(mut slot) => {
                let Value::Str(raw) = &mut slot.get_mut().value else {
                    return Err(wrong_type(key));
                };
                let next = raw
                    .parse::<u64>()
                    .map_err(|_| CacheError::InvalidData(format!("key {key} is not an integer")))?
                    .checked_add(1)
                    .ok_or_else(|| CacheError::InvalidData(format!("counter {key} overflowed")))?;
                *raw = next.to_string();
                Ok(next)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Slot {
                    value: Value::Str("1".to_string()),
                    expires_at: None,
                });
                Ok(1)
            }
        }
    }
}

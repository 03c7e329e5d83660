use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jiff::Timestamp;
use linko_core::error::StorageError;
use linko_core::repository::{NewUrlRecord, Repository, Result, UrlRecord};
use linko_core::shortcode::ShortCode;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory implementation of the Repository trait using DashMap.
///
/// Rows are keyed by short code; ids are assigned from a counter starting
/// at 1, like an auto-increment column.
#[derive(Debug)]
pub struct InMemoryRepository {
    rows: DashMap<String, UrlRecord>,
    next_id: AtomicU64,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn insert(&self, record: &NewUrlRecord) -> Result<u64> {
        match self.rows.entry(record.short_code.as_str().to_owned()) {
            Entry::Occupied(_) => Err(StorageError::Conflict(record.short_code.to_string())),
            Entry::Vacant(vacant) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let now = Timestamp::now();
                vacant.insert(UrlRecord {
                    id,
                    short_code: record.short_code.clone(),
                    original_url: record.original_url.clone(),
                    hit_count: 0,
                    created_at: now,
                    updated_at: now,
                });
                Ok(id)
            }
        }
    }

    async fn lookup(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        Ok(self.rows.get(code.as_str()).map(|row| row.clone()))
    }

    async fn increment_hit_count(&self, code: &ShortCode) -> Result<()> {
        let Some(mut row) = self.rows.get_mut(code.as_str()) else {
            return Err(StorageError::NotFound(code.to_string()));
        };
        row.hit_count += 1;
        row.updated_at = Timestamp::now();
        Ok(())
    }
}

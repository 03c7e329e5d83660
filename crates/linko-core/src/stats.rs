use crate::repository::UrlRecord;
use crate::shortcode::ShortCode;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A point-in-time view of a short URL's counters.
///
/// Snapshots are cached with their own TTL and are never invalidated by
/// writes, so `hit_count` may lag behind the durable row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub code: ShortCode,
    pub hit_count: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub original_url: String,
}

impl From<UrlRecord> for StatsSnapshot {
    fn from(record: UrlRecord) -> Self {
        Self {
            code: record.short_code,
            hit_count: record.hit_count,
            created_at: record.created_at,
            updated_at: record.updated_at,
            original_url: record.original_url,
        }
    }
}

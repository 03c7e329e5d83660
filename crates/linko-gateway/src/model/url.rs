use jiff::Timestamp;
use linko_core::{ShortenedUrl, StatsSnapshot};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ShortenRequest {
    /// Missing and empty are both reported as "url is required".
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ShortenResponse {
    pub short_url: String,
    pub code: String,
}

impl From<ShortenedUrl> for ShortenResponse {
    fn from(shortened: ShortenedUrl) -> Self {
        Self {
            short_url: shortened.short_url,
            code: shortened.code.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub code: String,
    pub count: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub original_url: String,
}

impl From<StatsSnapshot> for StatsResponse {
    fn from(snapshot: StatsSnapshot) -> Self {
        Self {
            code: snapshot.code.as_str().to_string(),
            count: snapshot.hit_count,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
            original_url: snapshot.original_url,
        }
    }
}

use clap::{Parser, ValueEnum};
use linko_cache::UrlCacheSettings;
use linko_core::retry::RetryPolicy;
use linko_core::{CodeLength, CoreError};
use linko_telemetry::{LogFormat, TelemetryConfig};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::time::Duration;

pub const LISTEN_ADDR_ENV: &str = "LINKO_LISTEN_ADDR";
pub const BASE_URL_ENV: &str = "LINKO_BASE_URL";
pub const CACHE_BACKEND_ENV: &str = "LINKO_CACHE_BACKEND";
pub const REDIS_URL_ENV: &str = "LINKO_REDIS_URL";
pub const STORAGE_BACKEND_ENV: &str = "LINKO_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "LINKO_MYSQL_DSN";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheBackendArg {
    #[value(name = "memory")]
    Memory,
    #[value(name = "redis")]
    Redis,
}

impl Display for CacheBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackendArg::Memory => write!(f, "memory"),
            CacheBackendArg::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "memory")]
    Memory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::Memory => write!(f, "memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "linko", about = "URL shortener gateway")]
pub struct Config {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Prefix of every issued short URL.
    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(
        long,
        env = CACHE_BACKEND_ENV,
        value_enum,
        default_value_t = CacheBackendArg::Memory
    )]
    pub cache: CacheBackendArg,

    #[arg(long, env = REDIS_URL_ENV, required_if_eq("cache", "redis"))]
    pub redis_url: Option<String>,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::Memory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    #[arg(long, env = "LINKO_MIN_CODE_LENGTH", default_value_t = 7)]
    pub min_code_length: usize,

    #[arg(long, env = "LINKO_MAX_CODE_LENGTH", default_value_t = 8)]
    pub max_code_length: usize,

    /// TTL of cached URL entries.
    #[arg(long, env = "LINKO_CACHE_TTL_SECS", default_value_t = 86_400)]
    pub cache_ttl_secs: u64,

    #[arg(long, env = "LINKO_STATS_TTL_SECS", default_value_t = 60)]
    pub stats_ttl_secs: u64,

    /// Period of the expired-key sweep of the memory cache.
    #[arg(long, env = "LINKO_CACHE_SWEEP_SECS", default_value_t = 60)]
    pub cache_sweep_secs: u64,

    /// Bound on every cache and database call.
    #[arg(long, env = "LINKO_STORE_TIMEOUT_MS", default_value_t = 3_000)]
    pub store_timeout_ms: u64,

    #[arg(long, env = "LINKO_QUEUE_CAPACITY", default_value_t = 10)]
    pub queue_capacity: usize,

    #[arg(long, env = "LINKO_WORKER_MAX_ATTEMPTS", default_value_t = 3)]
    pub worker_max_attempts: u32,

    /// First backoff of the write-behind worker; doubles per attempt.
    #[arg(long, env = "LINKO_WORKER_BACKOFF_MS", default_value_t = 200)]
    pub worker_backoff_ms: u64,

    #[arg(long, env = "LINKO_HIT_MAX_ATTEMPTS", default_value_t = 3)]
    pub hit_max_attempts: u32,

    #[arg(long, env = "LINKO_HIT_DELAY_MS", default_value_t = 200)]
    pub hit_delay_ms: u64,

    /// Background tasks allowed to run at once.
    #[arg(long, env = "LINKO_BACKGROUND_LIMIT", default_value_t = 256)]
    pub background_limit: usize,

    #[arg(long, env = "LINKO_CONNECT_ATTEMPTS", default_value_t = 10)]
    pub connect_attempts: u32,

    #[arg(long, env = "LINKO_CONNECT_DELAY_MS", default_value_t = 2_000)]
    pub connect_delay_ms: u64,

    #[arg(long, env = "LINKO_SHUTDOWN_TIMEOUT_SECS", default_value_t = 10)]
    pub shutdown_timeout_secs: u64,

    #[arg(long, env = "LINKO_LOG_FORMAT", value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,

    #[arg(long, env = "LINKO_LOG_FILTER", default_value = "info")]
    pub log_filter: String,

    #[arg(long, env = "LINKO_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

impl Config {
    pub fn code_length(&self) -> Result<CodeLength, CoreError> {
        CodeLength::new(self.min_code_length, self.max_code_length)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn cache_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache_sweep_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn worker_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(
            self.worker_max_attempts,
            Duration::from_millis(self.worker_backoff_ms),
        )
    }

    pub fn hit_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.hit_max_attempts, Duration::from_millis(self.hit_delay_ms))
    }

    pub fn connect_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.connect_attempts,
            Duration::from_millis(self.connect_delay_ms),
        )
    }

    pub fn cache_settings(&self) -> UrlCacheSettings {
        UrlCacheSettings::builder()
            .entry_ttl(Duration::from_secs(self.cache_ttl_secs))
            .stats_ttl(Duration::from_secs(self.stats_ttl_secs))
            .build()
    }

    pub fn telemetry(&self) -> TelemetryConfig {
        let format = match self.log_format {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        };
        TelemetryConfig {
            service_name: "linko".to_string(),
            filter: self.log_filter.clone(),
            format,
            otlp_endpoint: self.otlp_endpoint.clone(),
        }
    }
}

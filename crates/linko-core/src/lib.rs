//! Core types and traits for the Linko URL shortener.
//!
//! This crate provides the domain types, store abstractions and shared
//! runtime helpers used by the shortening and redirect pipelines.

pub mod background;
pub mod base62;
pub mod cache;
pub mod error;
pub mod repository;
pub mod retry;
pub mod shortcode;
pub mod shortener;
pub mod stats;
pub mod validation;

pub use background::BackgroundTasks;
pub use cache::{CacheStore, CachedUrlEntry};
pub use error::{CacheError, CoreError, ShortenerError, StorageError};
pub use repository::{NewUrlRecord, Repository, UrlRecord};
pub use retry::{retry, Backoff, RetryError, RetryPolicy};
pub use shortcode::{CodeLength, ShortCode};
pub use shortener::{Redirector, ShortenedUrl, Shortener};
pub use stats::StatsSnapshot;
pub use validation::validate_original_url;

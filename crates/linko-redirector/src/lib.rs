//! Redirect pipeline for Linko.
//!
//! [`RedirectorService`] resolves short codes cache-first with a fallback
//! to the durable store, and counts hits through a [`HitCounter`].

pub mod hits;
pub mod service;

pub use hits::HitCounter;
pub use service::RedirectorService;

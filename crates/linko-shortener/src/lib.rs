//! Shortening pipeline for Linko.
//!
//! [`ShortenerService`] answers the write path from the cache and hands
//! durable persistence to a [`WriteBehindWorker`] through a bounded
//! [`PersistQueue`].

pub mod queue;
pub mod service;
pub mod worker;

pub use queue::{persist_queue, PendingPersistTask, PersistQueue, PersistReceiver};
pub use service::ShortenerService;
pub use worker::{WorkerError, WorkerReport, WriteBehindWorker};

use crate::queue::{PendingPersistTask, PersistReceiver};
use linko_cache::UrlCache;
use linko_core::cache::CacheStore;
use linko_core::retry::{retry, RetryError, RetryPolicy};
use linko_core::{CacheError, CachedUrlEntry, NewUrlRecord, Repository, ShortCode, StorageError};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum WorkerError {
    /// The insert kept failing; the mapping only lives in the cache now.
    #[error("lost {code} -> {original_url} after {attempts} attempts: {source}")]
    DurabilityLoss {
        code: ShortCode,
        original_url: String,
        attempts: u32,
        source: StorageError,
    },
    /// The code is already stored for a different URL.
    #[error("short code {code} is taken by a different url")]
    Collision { code: ShortCode, original_url: String },
    /// The row exists but the cache entry still says `persisted = "0"`.
    #[error("persisted {code} but failed to promote the cache entry: {source}")]
    Promotion { code: ShortCode, source: CacheError },
}

/// Counters reported when the worker stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub persisted: u64,
    pub failed: u64,
}

/// Single consumer of the persist queue.
///
/// Tasks are handled one at a time in FIFO order: insert the row with
/// bounded retries, then mark the cache entry persisted.
pub struct WriteBehindWorker<R, S> {
    repository: Arc<R>,
    cache: UrlCache<S>,
    receiver: PersistReceiver,
    policy: RetryPolicy,
}

impl<R: Repository, S: CacheStore> WriteBehindWorker<R, S> {
    pub fn new(
        repository: Arc<R>,
        cache: UrlCache<S>,
        receiver: PersistReceiver,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            repository,
            cache,
            receiver,
            policy,
        }
    }

    /// Consumes tasks until every producer is gone or `shutdown` fires.
    ///
    /// On shutdown the queue is closed and the buffered tasks are still
    /// persisted before returning.
    pub async fn run(mut self, shutdown: CancellationToken) -> WorkerReport {
        let mut report = WorkerReport::default();
        info!(
            max_attempts = self.policy.max_attempts(),
            "write-behind worker started"
        );

        loop {
            let task = tokio::select! {
                task = self.receiver.recv() => task,
                _ = shutdown.cancelled() => {
                    self.receiver.close();
                    info!(pending = self.receiver.len(), "draining persist queue");
                    while let Some(task) = self.receiver.recv().await {
                        self.handle(task, &mut report).await;
                    }
                    break;
                }
            };

            match task {
                Some(task) => self.handle(task, &mut report).await,
                None => break,
            }
        }

        info!(
            persisted = report.persisted,
            failed = report.failed,
            "write-behind worker stopped"
        );
        report
    }

    async fn handle(&self, task: PendingPersistTask, report: &mut WorkerReport) {
        match self.process(&task).await {
            Ok(()) => report.persisted += 1,
            Err(err) => {
                report.failed += 1;
                match &err {
                    WorkerError::DurabilityLoss { code, original_url, attempts, .. } => error!(
                        code = %code,
                        original_url = %original_url,
                        attempts,
                        error = %err,
                        "durability loss: giving up on short url"
                    ),
                    WorkerError::Collision { code, original_url } => error!(
                        code = %code,
                        original_url = %original_url,
                        "short code collision"
                    ),
                    WorkerError::Promotion { code, .. } => warn!(
                        code = %code,
                        error = %err,
                        "row stored but cache entry not promoted"
                    ),
                }
            }
        }
    }

    /// Persists one task and promotes its cache entry.
    pub async fn process(&self, task: &PendingPersistTask) -> Result<(), WorkerError> {
        let record = NewUrlRecord::new(task.code.clone(), task.original_url.clone());

        let inserted = retry(
            &self.policy,
            "persist short url",
            |_| self.repository.insert(&record),
            |e| !matches!(e, StorageError::Conflict(_)),
        )
        .await;

        match inserted {
            Ok(id) => debug!(code = %task.code, id, "short url persisted"),
            Err(RetryError {
                source: StorageError::Conflict(_),
                ..
            }) => self.confirm_existing(task).await?,
            Err(RetryError { attempts, source }) => {
                return Err(WorkerError::DurabilityLoss {
                    code: task.code.clone(),
                    original_url: task.original_url.clone(),
                    attempts,
                    source,
                })
            }
        }

        self.cache
            .put_entry(&task.code, &CachedUrlEntry::persisted(task.original_url.as_str()))
            .await
            .map_err(|source| WorkerError::Promotion {
                code: task.code.clone(),
                source,
            })
    }

    /// A conflicting insert is fine if the stored row holds the same URL.
    async fn confirm_existing(&self, task: &PendingPersistTask) -> Result<(), WorkerError> {
        match self.repository.lookup(&task.code).await {
            Ok(Some(row)) if row.original_url == task.original_url => {
                debug!(code = %task.code, "short url was already persisted");
                Ok(())
            }
            Ok(_) => Err(WorkerError::Collision {
                code: task.code.clone(),
                original_url: task.original_url.clone(),
            }),
            Err(source) => Err(WorkerError::DurabilityLoss {
                code: task.code.clone(),
                original_url: task.original_url.clone(),
                attempts: 1,
                source,
            }),
        }
    }
}

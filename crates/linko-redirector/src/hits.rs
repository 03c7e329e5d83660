use linko_core::retry::{retry, RetryPolicy};
use linko_core::{BackgroundTasks, Repository, ShortCode};
use std::sync::Arc;
use tracing::{debug, warn};

/// Fire-and-forget hit-count updates.
///
/// Every recorded hit becomes one background increment with bounded
/// retries. A missing row is retried too, since a cache-ahead code may
/// not be persisted yet.
pub struct HitCounter<R> {
    repository: Arc<R>,
    tasks: BackgroundTasks,
    policy: RetryPolicy,
}

impl<R> Clone for HitCounter<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            tasks: self.tasks.clone(),
            policy: self.policy.clone(),
        }
    }
}

impl<R: Repository> HitCounter<R> {
    pub fn new(repository: Arc<R>, tasks: BackgroundTasks, policy: RetryPolicy) -> Self {
        Self {
            repository,
            tasks,
            policy,
        }
    }

    /// Schedules one increment for `code` and returns immediately.
    pub fn record(&self, code: ShortCode) {
        let repository = Arc::clone(&self.repository);
        let policy = self.policy.clone();

        self.tasks.spawn("hit count", async move {
            let outcome = retry(
                &policy,
                "increment hit count",
                |_| repository.increment_hit_count(&code),
                |_| true,
            )
            .await;

            match outcome {
                Ok(()) => debug!(code = %code, "hit counted"),
                Err(err) => warn!(
                    code = %code,
                    attempts = err.attempts,
                    error = %err.source,
                    "giving up on hit count"
                ),
            }
        });
    }
}

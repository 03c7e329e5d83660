use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

/// Default number of background tasks allowed to run at once.
pub const DEFAULT_BACKGROUND_LIMIT: usize = 256;

/// Bounded, tracked spawner for fire-and-forget work.
///
/// Every task waits for a permit before running, so at most `limit` tasks
/// make progress at once. Tasks are never dropped for lack of a permit.
/// Tracking lets shutdown wait for in-flight work. After
/// [`shutdown`](Self::shutdown) every new task is discarded.
#[derive(Clone, Debug)]
pub struct BackgroundTasks {
    tracker: TaskTracker,
    permits: Arc<Semaphore>,
    closed: Arc<AtomicBool>,
}

impl BackgroundTasks {
    pub fn new(limit: usize) -> Self {
        Self {
            tracker: TaskTracker::new(),
            permits: Arc::new(Semaphore::new(limit.max(1))),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Spawns `task` once a permit is available. Returns immediately.
    ///
    /// Tasks spawned after shutdown are dropped without running.
    pub fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_shut_down() {
            warn!(task = name, "background tasks shut down, dropping task");
            return;
        }
        let permits = Arc::clone(&self.permits);
        self.tracker.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                warn!(task = name, "background permits closed, skipping task");
                return;
            };
            debug!(task = name, "background task started");
            task.await;
        });
    }

    /// Number of tasks spawned and not yet finished.
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Waits until every task spawned so far has finished.
    ///
    /// New tasks may still be spawned afterwards, unless shutdown has begun.
    pub async fn idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        if !self.is_shut_down() {
            self.tracker.reopen();
        }
    }

    /// Stops accepting new work and waits up to `timeout` for running tasks.
    ///
    /// Returns `false` if tasks were still running when the timeout elapsed.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.closed.store(true, Ordering::Release);
        self.tracker.close();
        match tokio::time::timeout(timeout, self.tracker.wait()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    remaining = self.tracker.len(),
                    "background tasks still running at shutdown"
                );
                false
            }
        }
    }
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new(DEFAULT_BACKGROUND_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn runs_all_tasks() {
        let tasks = BackgroundTasks::new(4);
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let done = Arc::clone(&done);
            tasks.spawn("count", async move {
                done.fetch_add(1, Ordering::SeqCst);
            });
        }

        tasks.idle().await;
        assert_eq!(done.load(Ordering::SeqCst), 10);
        assert!(tasks.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn limit_bounds_concurrency() {
        let tasks = BackgroundTasks::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..6 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            tasks.spawn("sleepy", async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            });
        }

        tasks.idle().await;
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_times_out_on_stuck_task() {
        let tasks = BackgroundTasks::new(1);
        tasks.spawn("stuck", std::future::pending());

        assert!(!tasks.shutdown(Duration::from_millis(100)).await);
    }

    #[tokio::test]
    async fn idle_allows_more_work() {
        let tasks = BackgroundTasks::default();
        tasks.idle().await;

        let done = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&done);
        tasks.spawn("after-idle", async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        tasks.idle().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn spawn_after_shutdown_never_runs() {
        let tasks = BackgroundTasks::new(2);
        assert!(tasks.shutdown(Duration::from_secs(1)).await);

        let done = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&done);
        tasks.clone().spawn("late", async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(tasks.is_shut_down());
        assert!(tasks.is_empty());
        tasks.idle().await;
        tokio::task::yield_now().await;
        assert_eq!(done.load(Ordering::SeqCst), 0);
    }
}

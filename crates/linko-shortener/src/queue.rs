use linko_core::{ShortCode, ShortenerError};
use tokio::sync::mpsc;

/// Default number of tasks the queue buffers before producers block.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// A short URL waiting for its durable row.
///
/// Lives only in memory between enqueue and worker consumption; a process
/// crash loses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPersistTask {
    pub code: ShortCode,
    pub original_url: String,
}

/// Producer half of the bounded persist queue.
#[derive(Debug, Clone)]
pub struct PersistQueue {
    tx: mpsc::Sender<PendingPersistTask>,
}

/// Consumer half of the bounded persist queue, owned by the worker.
#[derive(Debug)]
pub struct PersistReceiver {
    rx: mpsc::Receiver<PendingPersistTask>,
}

/// Creates a bounded FIFO queue. A capacity of zero is raised to one.
pub fn persist_queue(capacity: usize) -> (PersistQueue, PersistReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (PersistQueue { tx }, PersistReceiver { rx })
}

impl PersistQueue {
    /// Enqueues `task`, waiting while the queue is full.
    ///
    /// Nothing is ever dropped; the only failure is a closed queue.
    pub async fn enqueue(&self, task: PendingPersistTask) -> Result<(), ShortenerError> {
        self.tx
            .send(task)
            .await
            .map_err(|_| ShortenerError::QueueClosed)
    }

    pub fn max_capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

impl PersistReceiver {
    pub async fn recv(&mut self) -> Option<PendingPersistTask> {
        self.rx.recv().await
    }

    /// Rejects further enqueues. Buffered tasks can still be received.
    pub fn close(&mut self) {
        self.rx.close();
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

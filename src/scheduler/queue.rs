//! In-memory work queue between the scanner and the worker pool.
//!
//! Entries are job ids that have already been claimed into the processing
//! directory. The queue itself is not persisted: if the process dies while
//! an id is only held here, the recovery pass rebuilds it from the
//! processing directory on the next start.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use super::job::JobId;

/// FIFO of claimed job ids with blocking, cancellable dequeue.
///
/// No priority and no deduplication: an id enqueued twice is dispatched
/// twice. Claim-by-rename is what keeps ids unique in practice.
#[derive(Debug, Default)]
pub struct WorkQueue {
    entries: Mutex<VecDeque<JobId>>,
    notify: Notify,
}

impl WorkQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a job id and wakes one waiting consumer.
    pub fn enqueue(&self, id: JobId) {
        self.lock().push_back(id);
        self.notify.notify_one();
    }

    /// Removes and returns the oldest id without waiting.
    pub fn try_dequeue(&self) -> Option<JobId> {
        let mut entries = self.lock();
        let id = entries.pop_front();
        // Hand the wake-up on if more work is waiting, so a burst of
        // enqueues that collapsed into one permit still reaches every idle
        // consumer.
        if id.is_some() && !entries.is_empty() {
            self.notify.notify_one();
        }
        id
    }

    /// Waits for the next job id.
    ///
    /// Returns the oldest id as soon as one is available, even after
    /// `shutdown` is cancelled, so consumers drain the queue before exiting.
    /// Returns `None` only when the queue is empty and `shutdown` has been
    /// cancelled.
    pub async fn dequeue(&self, shutdown: &CancellationToken) -> Option<JobId> {
        loop {
            if let Some(id) = self.try_dequeue() {
                return Some(id);
            }
            if shutdown.is_cancelled() {
                return None;
            }

            tokio::select! {
                _ = self.notify.notified() => {}
                _ = shutdown.cancelled() => {}
            }
        }
    }

    /// Number of pending entries. A snapshot; may be stale on return.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Removes all pending entries and returns them in FIFO order.
    pub fn drain(&self) -> Vec<JobId> {
        self.lock().drain(..).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<JobId>> {
        // A panic while holding the lock cannot leave the deque half-updated,
        // so a poisoned lock is still safe to use.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

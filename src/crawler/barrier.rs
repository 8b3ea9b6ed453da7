//! Completion barrier: counts outstanding traversal tasks
//!
//! The spawning task calls [`CompletionBarrier::register`] *before* handing
//! the returned [`TaskGuard`] to the spawned task, so the counter can never
//! read zero while a child is still about to start. The guard's `Drop` is the
//! task's single `done`, which covers early returns and panics alike.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Counter of outstanding tasks with an async wait for zero
#[derive(Debug, Default)]
pub struct CompletionBarrier {
    outstanding: AtomicUsize,
    added: AtomicUsize,
    done: AtomicUsize,
    drained: AtomicBool,
    zero: Notify,
}

impl CompletionBarrier {
    /// Creates a barrier with no outstanding tasks
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the outstanding count by `n`
    ///
    /// Must be called by the spawner, before the new tasks start. Adding after
    /// [`wait`](Self::wait) has returned is a programmer error.
    pub fn add(&self, n: usize) {
        debug_assert!(
            !self.drained.load(Ordering::Acquire),
            "CompletionBarrier::add called after wait() returned"
        );
        self.added.fetch_add(n, Ordering::Relaxed);
        self.outstanding.fetch_add(n, Ordering::AcqRel);
    }

    /// Registers one task and returns the guard that will mark it done
    pub fn register(self: &Arc<Self>) -> TaskGuard {
        self.add(1);
        TaskGuard {
            barrier: Arc::clone(self),
        }
    }

    /// Marks one task as finished, waking waiters if it was the last one
    pub fn done(&self) {
        self.done.fetch_add(1, Ordering::Relaxed);
        let previous = self.outstanding.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "CompletionBarrier::done without matching add");
        if previous == 1 {
            self.zero.notify_waiters();
        }
    }

    /// Waits until every registered task has called `done`
    pub async fn wait(&self) {
        loop {
            let notified = self.zero.notified();
            tokio::pin!(notified);
            // Register interest before checking so a concurrent final `done`
            // cannot slip between the load and the await.
            notified.as_mut().enable();

            if self.outstanding.load(Ordering::Acquire) == 0 {
                break;
            }
            notified.await;
        }
        self.drained.store(true, Ordering::Release);
    }

    /// Number of tasks currently registered and not yet done
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Total of all `add` increments so far
    pub fn total_added(&self) -> usize {
        self.added.load(Ordering::Relaxed)
    }

    /// Total `done` calls so far
    pub fn total_done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }
}

/// Marks its task done on drop
#[derive(Debug)]
#[must_use = "dropping the guard immediately marks the task done"]
pub struct TaskGuard {
    barrier: Arc<CompletionBarrier>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.barrier.done();
    }
}

//! Traversal scheduler: the per-task algorithm
//!
//! Each task processes one `(url, depth)` pair:
//!
//! 1. exit if the traversal was cancelled (nothing is claimed)
//! 2. exit if `depth == 0` (nothing is claimed)
//! 3. exit if the URL was already claimed by another task
//! 4. fetch; on failure log and exit
//! 5. emit a [`DiscoveryRecord`]
//! 6. spawn one task per child at `depth - 1`
//!
//! The spawner registers each child with the completion barrier before the
//! child starts; the child's guard is its single `done`.

use crate::crawler::barrier::CompletionBarrier;
use crate::crawler::fetcher::{FetchResult, FetchedPage, Fetcher};
use crate::crawler::registry::{Claim, VisitedRegistry};
use crate::crawler::report::{CrawlReport, DiscoveryRecord};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

/// How a task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskExit {
    /// Depth reached 0; the URL was neither claimed nor fetched
    DepthExhausted,
    /// Another task had already claimed the URL
    AlreadySeen,
    /// The traversal was cancelled before or during the fetch
    Cancelled,
    /// The fetcher reported a failure
    FetchFailed,
    /// The page was fetched and its children spawned
    Fetched { children: usize },
}

/// Exit counters shared by all tasks of a traversal
#[derive(Debug, Default)]
pub(crate) struct TraversalStats {
    fetched: AtomicU64,
    failed: AtomicU64,
    already_seen: AtomicU64,
    depth_exhausted: AtomicU64,
    cancelled: AtomicU64,
}

impl TraversalStats {
    fn record(&self, exit: TaskExit) {
        let counter = match exit {
            TaskExit::DepthExhausted => &self.depth_exhausted,
            TaskExit::AlreadySeen => &self.already_seen,
            TaskExit::Cancelled => &self.cancelled,
            TaskExit::FetchFailed => &self.failed,
            TaskExit::Fetched { .. } => &self.fetched,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Builds the report; call only after the barrier has drained
    pub(crate) fn report(&self, barrier: &CompletionBarrier, elapsed: Duration) -> CrawlReport {
        CrawlReport {
            pages_fetched: self.fetched.load(Ordering::Relaxed),
            fetch_failures: self.failed.load(Ordering::Relaxed),
            already_seen: self.already_seen.load(Ordering::Relaxed),
            depth_exhausted: self.depth_exhausted.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            tasks_registered: barrier.total_added() as u64,
            tasks_completed: barrier.total_done() as u64,
            elapsed,
        }
    }
}

/// State shared by every task of one traversal
///
/// Created per traversal and dropped once the last task finishes; dropping it
/// closes the record channel.
pub(crate) struct Traversal {
    fetcher: Arc<dyn Fetcher>,
    registry: VisitedRegistry,
    barrier: Arc<CompletionBarrier>,
    stats: Arc<TraversalStats>,
    records: mpsc::UnboundedSender<DiscoveryRecord>,
    cancel: CancellationToken,
    fetch_permits: Option<Arc<Semaphore>>,
}

impl Traversal {
    pub(crate) fn new(
        fetcher: Arc<dyn Fetcher>,
        records: mpsc::UnboundedSender<DiscoveryRecord>,
        cancel: CancellationToken,
        max_concurrent_fetches: Option<usize>,
    ) -> Self {
        Self {
            fetcher,
            registry: VisitedRegistry::new(),
            barrier: Arc::new(CompletionBarrier::new()),
            stats: Arc::new(TraversalStats::default()),
            records,
            cancel,
            fetch_permits: max_concurrent_fetches.map(|n| Arc::new(Semaphore::new(n.max(1)))),
        }
    }

    pub(crate) fn barrier(&self) -> Arc<CompletionBarrier> {
        Arc::clone(&self.barrier)
    }

    pub(crate) fn stats(&self) -> Arc<TraversalStats> {
        Arc::clone(&self.stats)
    }

    /// Registers a task for `(url, depth)` and spawns it
    ///
    /// Registration happens here, in the caller, before the task can run.
    pub(crate) fn spawn(self: &Arc<Self>, url: String, depth: u32) {
        let guard = self.barrier.register();
        let traversal = Arc::clone(self);

        tokio::spawn(async move {
            let _guard = guard;
            let exit = traversal.visit(url, depth).await;
            traversal.stats.record(exit);
        });
    }

    async fn visit(self: &Arc<Self>, url: String, depth: u32) -> TaskExit {
        if self.cancel.is_cancelled() {
            return TaskExit::Cancelled;
        }

        if depth == 0 {
            tracing::trace!("Depth exhausted at {}", url);
            return TaskExit::DepthExhausted;
        }

        if self.registry.claim(&url) == Claim::AlreadySeen {
            tracing::trace!("Already seen {}", url);
            return TaskExit::AlreadySeen;
        }

        // Losing the race drops the fetch future, which cancels it.
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                tracing::debug!("Fetch of {} cancelled", url);
                return TaskExit::Cancelled;
            }
            result = self.fetch(&url) => result,
        };

        let FetchedPage { body, children } = match result {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Fetch failed for {}: {}", url, e);
                return TaskExit::FetchFailed;
            }
        };

        tracing::debug!("Fetched {} ({} links, depth {})", url, children.len(), depth);

        // A closed channel means the consumer stopped listening; the
        // traversal itself still runs to completion.
        let _ = self.records.send(DiscoveryRecord {
            url,
            body,
            children: children.clone(),
        });

        let spawned = children.len();
        for child in children {
            self.spawn(child, depth - 1);
        }

        TaskExit::Fetched { children: spawned }
    }

    async fn fetch(&self, url: &str) -> FetchResult {
        let _permit = match &self.fetch_permits {
            Some(permits) => permits.acquire().await.ok(),
            None => None,
        };
        self.fetcher.fetch(url).await
    }
}

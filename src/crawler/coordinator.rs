//! Crawler coordinator - starts traversals and hands their output to the caller
//!
//! A traversal runs as a tree of tokio tasks. Records flow from those tasks
//! through one channel, so whoever consumes a [`DiscoveryStream`] (or the
//! callback given to [`Crawler::run`]) sees them one at a time. A driver task
//! waits on the completion barrier and produces the [`CrawlReport`].

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::report::{CrawlReport, DiscoveryRecord};
use crate::crawler::scheduler::Traversal;
use crate::CrawlError;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Entry point for running traversals with a given fetcher
///
/// Each call to [`stream`](Self::stream), [`run`](Self::run) or
/// [`collect`](Self::collect) is an independent traversal with its own
/// visited registry and completion barrier.
///
/// # Example
///
/// ```
/// use ripple_crawl::crawler::{Crawler, StaticFetcher};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), ripple_crawl::CrawlError> {
/// let fetcher = StaticFetcher::new()
///     .page("A", "a", ["B"])
///     .page("B", "b", ["A"]);
///
/// let (records, report) = Crawler::new(fetcher).collect("A", 10).await?;
/// assert_eq!(records.len(), 2);
/// assert_eq!(report.pages_fetched, 2);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Crawler {
    fetcher: Arc<dyn Fetcher>,
    max_concurrent_fetches: Option<usize>,
    cancel: CancellationToken,
}

impl Crawler {
    /// Creates a crawler with unlimited fetch concurrency
    pub fn new<F: Fetcher + 'static>(fetcher: F) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            max_concurrent_fetches: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Creates a crawler limited to the configured number of concurrent fetches
    pub fn from_config<F: Fetcher + 'static>(fetcher: F, config: &CrawlerConfig) -> Self {
        Self::new(fetcher).with_max_concurrent_fetches(config.max_concurrent_fetches as usize)
    }

    /// Limits the number of fetches in flight at once (minimum 1)
    ///
    /// Tasks beyond the limit still claim their URL, then wait for a permit.
    pub fn with_max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.max_concurrent_fetches = Some(limit.max(1));
        self
    }

    /// Uses `token` to cancel traversals started by this crawler
    ///
    /// Once cancelled, pending tasks exit without claiming their URL and
    /// in-flight fetches are dropped; the traversal still completes normally.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Returns the token that cancels this crawler's traversals
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Starts a traversal and returns its records as a stream
    ///
    /// The stream ends once every task has finished. Must be called from
    /// within a tokio runtime.
    ///
    /// Records are buffered without limit: tasks never wait on the consumer,
    /// so a slow reader holds every unread page body in memory. Bound the
    /// crawl with `max_depth` or `with_max_concurrent_fetches` when pages are
    /// large and the reader cannot keep up.
    pub fn stream(&self, root: impl Into<String>, max_depth: u32) -> DiscoveryStream {
        let root = root.into();
        debug_assert!(!root.is_empty(), "crawl root must not be empty");

        let started = Instant::now();
        let (tx, rx) = mpsc::unbounded_channel();
        let traversal = Arc::new(Traversal::new(
            Arc::clone(&self.fetcher),
            tx,
            self.cancel.clone(),
            self.max_concurrent_fetches,
        ));
        let barrier = traversal.barrier();
        let stats = traversal.stats();

        tracing::info!("Starting crawl of {} (max depth {})", root, max_depth);

        // The root is registered here, before anyone can wait on the barrier.
        traversal.spawn(root, max_depth);
        drop(traversal);

        let driver = tokio::spawn(async move {
            barrier.wait().await;
            let report = stats.report(&barrier, started.elapsed());
            tracing::info!(
                "Crawl finished: {} fetched, {} failed, {} duplicates skipped in {:?}",
                report.pages_fetched,
                report.fetch_failures,
                report.already_seen,
                report.elapsed
            );
            report
        });

        DiscoveryStream {
            records: rx,
            driver,
        }
    }

    /// Runs a traversal, handing each record to `on_record` in turn
    ///
    /// Calls to `on_record` never overlap.
    pub async fn run<F>(
        &self,
        root: impl Into<String>,
        max_depth: u32,
        mut on_record: F,
    ) -> Result<CrawlReport, CrawlError>
    where
        F: FnMut(DiscoveryRecord),
    {
        let mut stream = self.stream(root, max_depth);
        while let Some(record) = stream.next().await {
            on_record(record);
        }
        stream.report().await
    }

    /// Runs a traversal and gathers every record
    pub async fn collect(
        &self,
        root: impl Into<String>,
        max_depth: u32,
    ) -> Result<(Vec<DiscoveryRecord>, CrawlReport), CrawlError> {
        let mut records = Vec::new();
        let report = self.run(root, max_depth, |r| records.push(r)).await?;
        Ok((records, report))
    }
}

impl std::fmt::Debug for Crawler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crawler")
            .field("max_concurrent_fetches", &self.max_concurrent_fetches)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Records of a running traversal, in completion order
///
/// Dropping the stream does not stop the traversal; cancel it through the
/// crawler's token instead.
#[derive(Debug)]
pub struct DiscoveryStream {
    records: mpsc::UnboundedReceiver<DiscoveryRecord>,
    driver: JoinHandle<CrawlReport>,
}

impl DiscoveryStream {
    /// Waits for the traversal to finish and returns its report
    ///
    /// Records not yet consumed are discarded.
    pub async fn report(self) -> Result<CrawlReport, CrawlError> {
        let Self { records, driver } = self;
        drop(records);
        Ok(driver.await?)
    }
}

impl Stream for DiscoveryStream {
    type Item = DiscoveryRecord;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.records.poll_recv(cx)
    }
}

/// Crawls from `root` to `max_depth` hops and returns every record
///
/// Fetch failures are logged and skipped; this never fails.
///
/// # Example
///
/// ```
/// use ripple_crawl::crawler::{crawl, StaticFetcher};
///
/// # #[tokio::main]
/// # async fn main() {
/// let fetcher = StaticFetcher::new().page("A", "a", Vec::<String>::new());
/// let records = crawl("A", 1, fetcher).await;
/// assert_eq!(records.len(), 1);
/// # }
/// ```
pub async fn crawl<F: Fetcher + 'static>(
    root: impl Into<String>,
    max_depth: u32,
    fetcher: F,
) -> Vec<DiscoveryRecord> {
    Crawler::new(fetcher).stream(root, max_depth).collect().await
}

//! What a traversal produces: one record per fetched page and a final report

use serde::Serialize;
use std::time::Duration;

/// A successfully fetched page, as emitted by the traversal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryRecord {
    /// The URL that was fetched
    pub url: String,

    /// Page body content
    pub body: String,

    /// URLs discovered on the page
    pub children: Vec<String>,
}

/// Summary of one traversal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Fetches that succeeded (one record each)
    pub pages_fetched: u64,

    /// Fetches that failed
    pub fetch_failures: u64,

    /// Tasks that lost the claim for their URL
    pub already_seen: u64,

    /// Tasks that reached depth 0
    pub depth_exhausted: u64,

    /// Tasks stopped by cancellation
    pub cancelled: u64,

    /// Tasks registered with the completion barrier
    pub tasks_registered: u64,

    /// Tasks that marked themselves done
    pub tasks_completed: u64,

    /// Wall-clock time from start until the barrier drained
    pub elapsed: Duration,
}

impl CrawlReport {
    /// Number of fetcher invocations that returned
    pub fn fetch_attempts(&self) -> u64 {
        self.pages_fetched + self.fetch_failures
    }

    /// Every registered task was matched by exactly one `done`
    pub fn is_balanced(&self) -> bool {
        self.tasks_registered == self.tasks_completed
    }

    /// Returns true if any task was stopped by cancellation
    pub fn was_cancelled(&self) -> bool {
        self.cancelled > 0
    }
}

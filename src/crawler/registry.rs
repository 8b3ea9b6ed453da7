//! Visited registry shared by every task of one traversal
//!
//! The registry is the only thing standing between the traversal and duplicate
//! fetches: a URL is fetched only by the task that wins [`VisitedRegistry::claim`].

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Outcome of a claim attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// This caller reserved the URL and must process it
    Claimed,
    /// Another caller reserved the URL first
    AlreadySeen,
}

/// Concurrency-safe set of URLs that have been claimed for processing
///
/// Claims are monotonic: a URL never leaves the set during a traversal.
#[derive(Debug, Default)]
pub struct VisitedRegistry {
    claimed: Mutex<HashSet<String>>,
}

impl VisitedRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically tests for `url` and inserts it if absent
    ///
    /// Returns [`Claim::Claimed`] for exactly one caller per URL, no matter how
    /// many tasks race on it.
    pub fn claim(&self, url: &str) -> Claim {
        let mut claimed = self.lock();
        if claimed.contains(url) {
            Claim::AlreadySeen
        } else {
            claimed.insert(url.to_string());
            Claim::Claimed
        }
    }

    /// Returns true if `url` has been claimed
    pub fn contains(&self, url: &str) -> bool {
        self.lock().contains(url)
    }

    /// Number of claimed URLs
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing has been claimed yet
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Inserts are a single `HashSet::insert`, so a panic elsewhere while the
    // lock was held cannot leave the set half-updated.
    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.claimed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

//! Crawler module: the parallel, deduplicating traversal and its fetchers
//!
//! This module contains:
//! - the visited registry that makes every fetch happen at most once
//! - the completion barrier that tells a traversal when it is done
//! - the per-task scheduling algorithm and the public [`Crawler`] API
//! - the [`Fetcher`] capability with an HTTP and an in-memory implementation

mod barrier;
mod coordinator;
mod fetcher;
mod http;
mod parser;
mod registry;
mod report;
mod scheduler;

pub use barrier::{CompletionBarrier, TaskGuard};
pub use coordinator::{crawl, Crawler, DiscoveryStream};
pub use fetcher::{FetchResult, FetchedPage, Fetcher, StaticFetcher};
pub use http::{build_http_client, HttpFetcher};
pub use parser::extract_links;
pub use registry::{Claim, VisitedRegistry};
pub use report::{CrawlReport, DiscoveryRecord};
pub use scheduler::TaskExit;

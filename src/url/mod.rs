//! URL handling for Ripple-Crawl
//!
//! The traversal compares URLs by exact string equality, so anything that
//! feeds URLs into it (the HTTP fetcher, the command line) normalizes them
//! here first.

mod normalize;

pub use normalize::normalize_url;

//! The fetch capability consumed by the traversal
//!
//! The traversal never talks to the network itself. Anything that can turn a
//! URL into a body plus a list of child URLs can drive it: the HTTP fetcher in
//! [`super::http`], the canned [`StaticFetcher`], or a caller's own type.

use crate::FetchError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// A successfully fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Page body content
    pub body: String,

    /// URLs discovered on the page, in page order
    pub children: Vec<String>,
}

impl FetchedPage {
    /// Creates a page from a body and its child URLs
    pub fn new<B, I, S>(body: B, children: I) -> Self
    where
        B: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            body: body.into(),
            children: children.into_iter().map(Into::into).collect(),
        }
    }
}

/// Outcome of one fetch: `Ok` is the page, `Err` means the fetch failed
pub type FetchResult = Result<FetchedPage, FetchError>;

/// Retrieves a URL and reports the URLs it links to
///
/// Implementations may block for arbitrary time and must tolerate concurrent
/// calls from many tasks. Time bounds are the implementation's business; the
/// traversal imposes none.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url`
    async fn fetch(&self, url: &str) -> FetchResult;
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    async fn fetch(&self, url: &str) -> FetchResult {
        (**self).fetch(url).await
    }
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for Box<F> {
    async fn fetch(&self, url: &str) -> FetchResult {
        (**self).fetch(url).await
    }
}

/// Fetcher that serves canned pages from memory
///
/// Unknown URLs fail with [`FetchError::NotFound`].
///
/// # Example
///
/// ```
/// use ripple_crawl::crawler::StaticFetcher;
///
/// let fetcher = StaticFetcher::new()
///     .page("A", "a", ["B", "C"])
///     .page("B", "b", ["A"]);
/// assert_eq!(fetcher.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    pages: HashMap<String, FetchedPage>,
}

impl StaticFetcher {
    /// Creates a fetcher with no pages
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a canned page
    pub fn page<U, B, I, S>(mut self, url: U, body: B, children: I) -> Self
    where
        U: Into<String>,
        B: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pages.insert(url.into(), FetchedPage::new(body, children));
        self
    }

    /// Number of canned pages
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Returns true if there are no canned pages
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// A small slice of golang.org with cycles back to the root
    ///
    /// `https://golang.org/cmd/` is linked but has no page, so crawling this
    /// graph always produces one fetch failure.
    pub fn golang_tour() -> Self {
        Self::new()
            .page(
                "https://golang.org/",
                "The Go Programming Language",
                ["https://golang.org/pkg/", "https://golang.org/cmd/"],
            )
            .page(
                "https://golang.org/pkg/",
                "Packages",
                [
                    "https://golang.org/",
                    "https://golang.org/cmd/",
                    "https://golang.org/pkg/fmt/",
                    "https://golang.org/pkg/os/",
                ],
            )
            .page(
                "https://golang.org/pkg/fmt/",
                "Package fmt",
                ["https://golang.org/", "https://golang.org/pkg/"],
            )
            .page(
                "https://golang.org/pkg/os/",
                "Package os",
                ["https://golang.org/", "https://golang.org/pkg/"],
            )
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                url: url.to_string(),
            })
    }
}

//! HTTP fetcher implementation
//!
//! One GET per URL. Responses are classified as:
//!
//! | Condition | Result |
//! |-----------|--------|
//! | HTTP 404 / 410 | `FetchError::NotFound` |
//! | Other non-2xx | `FetchError::Status` |
//! | Timeout, connect or body error | `FetchError::Request` |
//! | 2xx with `text/html` | page with extracted links |
//! | 2xx with any other type | page with no children |
//!
//! Redirects are followed by the client; links are resolved against the final
//! URL.

use crate::config::{HttpConfig, UserAgentConfig};
use crate::crawler::fetcher::{FetchResult, FetchedPage, Fetcher};
use crate::crawler::parser::extract_links;
use crate::{Config, FetchError};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use std::time::Duration;

/// Builds an HTTP client from the user agent and HTTP settings
///
/// # Example
///
/// ```no_run
/// use ripple_crawl::config::{HttpConfig, UserAgentConfig};
/// use ripple_crawl::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), &HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    http: &HttpConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(http.request_timeout_secs))
        .connect_timeout(Duration::from_secs(http.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetcher that retrieves pages over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher around an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a fetcher with a client built from `config`
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        build_http_client(&config.user_agent, &config.http).map(Self::new)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        let request_error = |source: reqwest::Error| FetchError::Request {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(request_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(FetchError::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let is_html = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.to_ascii_lowercase().contains("text/html"))
            .unwrap_or(false);

        let body = response.text().await.map_err(request_error)?;

        let children = if is_html {
            extract_links(&body, &final_url)
        } else {
            tracing::trace!("{} is not HTML, reporting no links", url);
            Vec::new()
        };

        Ok(FetchedPage { body, children })
    }
}

pub mod html;
pub mod http;
pub mod rendered;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, Context};
use async_trait::async_trait;
use thiserror::Error;

use crate::cli::config::HarvesterConfig;
use crate::crawler::task::FetchStrategy;

// Re-export common types
pub use http::StaticFetcher;
pub use rendered::RenderedFetcher;

/// A fetched page: its final URL, markup, and raw anchor targets
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// URL the content was served from, after redirects
    pub url: String,

    /// Page markup
    pub content: String,

    /// `href` values of every anchor, unresolved
    pub links: Vec<String>,
}

/// Failure to retrieve one URL
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("fetching {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },

    #[error("browser could not load {url}: {reason}")]
    Navigation { url: String, reason: String },

    #[error("rendering engine could not start: {reason}")]
    EngineLaunch { reason: String },
}

/// Capability shared by the page retrieval backends
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Retrieve a page and its anchors
    async fn fetch(&self, url: &str) -> Result<Page, FetchError>;

    /// Whether pages are rendered with scripts executed
    fn renders_scripts(&self) -> bool;
}

/// Build the backend for a fetch strategy
pub fn build_fetcher(strategy: FetchStrategy, config: &HarvesterConfig) -> Result<Arc<dyn Fetcher>> {
    match strategy {
        FetchStrategy::Static => {
            let fetcher = StaticFetcher::new(&config.crawler)
                .context("Failed to create HTTP client")?;
            Ok(Arc::new(fetcher))
        }
        FetchStrategy::Rendered => Ok(Arc::new(RenderedFetcher::new(config.browser.clone()))),
    }
}

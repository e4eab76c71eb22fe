use serde::{Serialize, Deserialize};
use thiserror::Error;
use url::Url;

use crate::fetch::FetchError;
use crate::utils::domain::{parse_seed, site_domain};

/// What a crawl harvests from every fetched page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
    /// Email addresses found in page markup
    Emails,

    /// External domains the page links to
    OutgoingLinks,
}

impl ExtractorKind {
    /// Column header used for the extracted values
    pub fn column(&self) -> &'static str {
        match self {
            ExtractorKind::Emails => "Emails",
            ExtractorKind::OutgoingLinks => "Links",
        }
    }

    /// Separator used when joining values into one cell
    pub fn separator(&self) -> &'static str {
        match self {
            ExtractorKind::Emails => ", ",
            ExtractorKind::OutgoingLinks => "\n",
        }
    }
}

/// How pages are retrieved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStrategy {
    /// Plain HTTP fetch, scripts are not executed
    Static,

    /// Full browser render through WebDriver
    Rendered,
}

/// One bounded traversal starting from a single seed URL
#[derive(Debug, Clone)]
pub struct CrawlJob {
    /// Seed URL as supplied by the caller
    pub seed: String,

    /// Parsed seed URL, depth 0 of the traversal
    pub seed_url: Url,

    /// Domain every followed link must resolve to
    pub domain: String,

    /// Deepest link hop that is still fetched
    pub max_depth: u32,

    pub extractor: ExtractorKind,
    pub strategy: FetchStrategy,
}

impl CrawlJob {
    pub fn new(
        seed: &str,
        max_depth: u32,
        extractor: ExtractorKind,
        strategy: FetchStrategy,
    ) -> Result<Self, JobError> {
        let seed_url = parse_seed(seed)
            .ok_or_else(|| JobError::InvalidSeed(seed.to_string()))?;
        let domain = site_domain(&seed_url)
            .ok_or_else(|| JobError::InvalidSeed(seed.to_string()))?;

        Ok(Self {
            seed: seed.to_string(),
            seed_url,
            domain,
            max_depth,
            extractor,
            strategy,
        })
    }
}

/// A URL waiting in the frontier together with its link distance from the seed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: Url,
    pub depth: u32,
}

/// Errors that end a whole job
#[derive(Debug, Error)]
pub enum JobError {
    #[error("invalid seed URL: {0}")]
    InvalidSeed(String),

    #[error("rendering engine could not start: {0}")]
    EngineLaunch(String),

    #[error("seed page could not be fetched: {0}")]
    SeedUnreachable(#[source] FetchError),

    #[error("crawl cancelled")]
    Cancelled,
}

//! Pluggable page extractors.
//!
//! Extractors are pure: given a fetched page they return the set of values it
//! contributes, without I/O or state carried between pages.

pub mod email;
pub mod links;

use std::collections::BTreeSet;

use url::Url;

use crate::cli::config::ExtractorSettings;
use crate::crawler::task::ExtractorKind;

// Re-export common types
pub use email::{extract_emails, EmailExtractor};
pub use links::OutgoingLinkExtractor;

/// Everything an extractor may look at for one page
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    /// URL the page was served from
    pub url: &'a Url,

    /// Domain of the page, `www.` removed
    pub domain: &'a str,

    /// Page markup
    pub content: &'a str,

    /// Raw anchor targets of the page
    pub links: &'a [String],
}

/// Turns one page into a set of result strings
pub trait Extractor: Send + Sync {
    fn extract(&self, page: &PageContext<'_>) -> BTreeSet<String>;
}

/// Build the extractor for a harvest kind
pub fn build_extractor(kind: ExtractorKind, settings: &ExtractorSettings) -> Box<dyn Extractor> {
    match kind {
        ExtractorKind::Emails => Box::new(EmailExtractor::new(settings.contact_keywords.clone())),
        ExtractorKind::OutgoingLinks => Box::new(OutgoingLinkExtractor::new(
            settings.excluded_domains.clone(),
            settings.excluded_patterns.clone(),
        )),
    }
}

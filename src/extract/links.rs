use std::collections::BTreeSet;

use url::Url;

use crate::extract::{Extractor, PageContext};
use crate::utils::domain::{is_web_url, site_domain};

/// Records the external domains a page links to, as `https://{domain}/`
pub struct OutgoingLinkExtractor {
    excluded_domains: Vec<String>,
    excluded_patterns: Vec<String>,
}

impl OutgoingLinkExtractor {
    pub fn new(excluded_domains: Vec<String>, excluded_patterns: Vec<String>) -> Self {
        let excluded_domains = excluded_domains
            .into_iter()
            .map(|domain| domain.to_lowercase())
            .collect();

        Self {
            excluded_domains,
            excluded_patterns,
        }
    }

    /// Whether `domain` is, or sits under, an excluded domain.
    /// Entries with a leading dot (`.gov`) match as plain suffixes.
    fn is_excluded_domain(&self, domain: &str) -> bool {
        self.excluded_domains.iter().any(|excluded| {
            if excluded.starts_with('.') {
                domain.ends_with(excluded.as_str())
            } else {
                domain == excluded || domain.ends_with(&format!(".{}", excluded))
            }
        })
    }

    /// Domain of an outgoing link, or `None` when the link does not qualify
    pub fn outgoing_domain(&self, page_url: &Url, origin: &str, href: &str) -> Option<String> {
        let absolute = page_url.join(href).ok()?;
        if !is_web_url(&absolute) {
            return None;
        }

        let domain = site_domain(&absolute)?;

        // Same site, including its subdomains
        if domain == origin || domain.ends_with(&format!(".{}", origin)) {
            return None;
        }

        if self.is_excluded_domain(&domain) {
            return None;
        }

        let absolute = absolute.as_str();
        if self.excluded_patterns.iter().any(|pattern| absolute.contains(pattern.as_str())) {
            return None;
        }

        Some(domain)
    }
}

impl Extractor for OutgoingLinkExtractor {
    fn extract(&self, page: &PageContext<'_>) -> BTreeSet<String> {
        page.links
            .iter()
            .filter_map(|href| self.outgoing_domain(page.url, page.domain, href))
            .map(|domain| format!("https://{}/", domain))
            .collect()
    }
}

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::extract::{Extractor, PageContext};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("email pattern is valid")
});

/// Distinct email addresses in the text, exactly as written
pub fn extract_emails(text: &str) -> BTreeSet<String> {
    EMAIL_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Harvests email addresses from page markup
pub struct EmailExtractor {
    /// Lowercase path keywords marking contact-style pages
    contact_keywords: Vec<String>,
}

impl EmailExtractor {
    pub fn new(contact_keywords: Vec<String>) -> Self {
        let contact_keywords = contact_keywords
            .into_iter()
            .map(|keyword| keyword.to_lowercase())
            .collect();

        Self { contact_keywords }
    }

    /// Whether the page path names a contact, about, or support page
    pub fn is_contact_page(&self, page: &PageContext<'_>) -> bool {
        let path = page.url.path().to_lowercase();
        self.contact_keywords.iter().any(|keyword| path.contains(keyword.as_str()))
    }
}

impl Extractor for EmailExtractor {
    fn extract(&self, page: &PageContext<'_>) -> BTreeSet<String> {
        let mut emails = extract_emails(page.content);

        // Contact pages get a second pass; it can only repeat what the first found
        if self.is_contact_page(page) {
            debug!("Re-scanning contact page {}", page.url);
            emails.extend(extract_emails(page.content));
        }

        emails
    }
}

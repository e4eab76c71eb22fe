use std::sync::LazyLock;

use scraper::{Html, Selector};

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector is valid"));

/// `href` attribute of every anchor in the markup, in document order.
///
/// Values are returned as written; resolution against the page URL is left to the caller.
pub fn anchor_hrefs(markup: &str) -> Vec<String> {
    let document = Html::parse_document(markup);

    document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|element| element.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
        .collect()
}

use url::Url;

/// Host of a URL in the form used for domain scoping: lowercase, leading `www.` removed.
///
/// Returns `None` for URLs without a host (`mailto:`, `data:`, ...).
pub fn site_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// Whether the URL uses a scheme the crawler can fetch.
pub fn is_web_url(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Parse a user-supplied seed, assuming `https://` when the scheme is missing.
pub fn parse_seed(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let parsed = if raw.contains("://") {
        Url::parse(raw).ok()?
    } else {
        Url::parse(&format!("https://{}", raw)).ok()?
    };

    if is_web_url(&parsed) && site_domain(&parsed).is_some() {
        Some(parsed)
    } else {
        None
    }
}

/// Normalize a URL to avoid duplicates due to minor differences
///
/// Fragments are dropped and query parameters sorted by key. Host casing and
/// default ports are already canonicalized by the `url` parser.
pub fn normalize_url(url: &Url) -> Url {
    let mut normalized = url.clone();

    // Remove fragments (anchors)
    normalized.set_fragment(None);

    // Sort query parameters if present
    if let Some(query) = normalized.query() {
        if query.is_empty() {
            normalized.set_query(None);
        } else {
            let mut params: Vec<(String, String)> = normalized
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();

            // Sort params by key, stable so repeated keys keep their order
            params.sort_by(|a, b| a.0.cmp(&b.0));

            normalized.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    normalized
}

/// Key under which a URL is recorded as visited.
///
/// Built from [`normalize_url`] with a leading `www.` removed from the host, so
/// every spelling that scopes to the same page maps to one key.
pub fn visit_key(url: &Url) -> String {
    let mut key = normalize_url(url);

    let bare_host = key
        .host_str()
        .and_then(|host| host.strip_prefix("www."))
        .map(str::to_string);

    if let Some(host) = bare_host {
        // Only fails for hosts the parser already accepted as something else
        let _ = key.set_host(Some(&host));
    }

    key.to_string()
}

/// URL as it should be requested: the fragment never reaches the server
pub fn fetch_url(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_domain_strips_www_and_case() {
        let url = Url::parse("https://WWW.Example.com/about").unwrap();
        assert_eq!(site_domain(&url), Some("example.com".to_string()));

        let url = Url::parse("mailto:info@example.com").unwrap();
        assert_eq!(site_domain(&url), None);
    }

    #[test]
    fn test_parse_seed() {
        assert_eq!(
            parse_seed("example.com").map(|u| u.to_string()),
            Some("https://example.com/".to_string())
        );
        assert_eq!(
            parse_seed(" http://example.com/a ").map(|u| u.to_string()),
            Some("http://example.com/a".to_string())
        );
        assert!(parse_seed("ftp://example.com").is_none());
        assert!(parse_seed("").is_none());
        assert!(parse_seed("not a url").is_none());
    }

    #[test]
    fn test_normalize_url() {
        let url = Url::parse("https://EXAMPLE.com:443/page#section").unwrap();
        assert_eq!(normalize_url(&url).as_str(), "https://example.com/page");

        let url = Url::parse("https://example.com/search?b=2&a=1").unwrap();
        assert_eq!(normalize_url(&url).as_str(), "https://example.com/search?a=1&b=2");

        let url = Url::parse("https://example.com/search?").unwrap();
        assert_eq!(normalize_url(&url).as_str(), "https://example.com/search");
    }

    #[test]
    fn test_visit_key_ignores_www_fragment_and_param_order() {
        let a = Url::parse("https://www.example.com/s?b=2&a=1#top").unwrap();
        let b = Url::parse("https://example.com/s?a=1&b=2").unwrap();

        assert_eq!(visit_key(&a), visit_key(&b));
        assert_eq!(visit_key(&b), "https://example.com/s?a=1&b=2");

        let other = Url::parse("https://blog.example.com/s?a=1&b=2").unwrap();
        assert_ne!(visit_key(&other), visit_key(&b));
    }

    #[test]
    fn test_fetch_url_keeps_query_as_written() {
        let url = Url::parse("https://example.com/s?flag&b=2&a=1#frag").unwrap();
        assert_eq!(fetch_url(&url).as_str(), "https://example.com/s?flag&b=2&a=1");
    }
}

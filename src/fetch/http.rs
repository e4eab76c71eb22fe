use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::cli::config::CrawlerSettings;
use crate::fetch::{html, FetchError, Fetcher, Page};

/// Fetches raw markup over HTTP without executing scripts
pub struct StaticFetcher {
    client: Client,
    timeout: Duration,
}

impl StaticFetcher {
    /// Create a fetcher with the crawler's user agent and network timeout
    pub fn new(settings: &CrawlerSettings) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(settings.fetch_timeout_secs);

        let client = Client::builder()
            .user_agent(&settings.user_agent)
            .timeout(timeout)
            .cookie_store(true)
            .build()?;

        Ok(Self { client, timeout })
    }

    fn request_error(&self, url: &str, source: reqwest::Error) -> FetchError {
        if source.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                after: self.timeout,
            }
        } else {
            FetchError::Request {
                url: url.to_string(),
                source,
            }
        }
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        debug!("GET {}", url);

        let response = self.client.get(url)
            .send()
            .await
            .map_err(|e| self.request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // Relative links resolve against where we ended up
        let final_url = response.url().to_string();

        let content = response.text()
            .await
            .map_err(|e| self.request_error(url, e))?;

        let links = html::anchor_hrefs(&content);

        Ok(Page {
            url: final_url,
            content,
            links,
        })
    }

    fn renders_scripts(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings() -> CrawlerSettings {
        CrawlerSettings {
            fetch_timeout_secs: 1,
            ..CrawlerSettings::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_returns_markup_and_anchors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<p>Write to info@example.com</p><a href="/about">About</a>"#,
            ))
            .mount(&server)
            .await;

        let fetcher = StaticFetcher::new(&settings()).unwrap();
        let page = fetcher.fetch(&format!("{}/", server.uri())).await.unwrap();

        assert!(page.content.contains("info@example.com"));
        assert_eq!(page.links, vec!["/about"]);
        assert_eq!(page.url, format!("{}/", server.uri()));
    }

    #[tokio::test]
    async fn test_error_status_is_a_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = StaticFetcher::new(&settings()).unwrap();
        let err = fetcher.fetch(&format!("{}/missing", server.uri())).await.unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let fetcher = StaticFetcher::new(&settings()).unwrap();
        let err = fetcher.fetch(&server.uri()).await.unwrap_err();

        assert!(matches!(err, FetchError::Timeout { .. }));
    }
}

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::debug;

use crate::browser::BrowserSession;
use crate::cli::config::BrowserSettings;
use crate::fetch::{html, FetchError, Fetcher, Page};

/// Fetches pages through a real browser so script-built content is visible.
///
/// Every fetch launches its own browser and quits it afterwards.
pub struct RenderedFetcher {
    config: BrowserSettings,
}

impl RenderedFetcher {
    pub fn new(config: BrowserSettings) -> Self {
        Self { config }
    }

    /// Longest a render may take once the browser is up
    pub fn render_ceiling(&self) -> Duration {
        Duration::from_secs(self.config.page_load_timeout_secs)
            + Duration::from_millis(self.config.settle_ms)
    }

    fn launch_ceiling(&self) -> Duration {
        Duration::from_secs(self.config.launch_timeout_secs)
    }
}

#[async_trait]
impl Fetcher for RenderedFetcher {
    async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        let mut session = match timeout(self.launch_ceiling(), BrowserSession::launch(self.config.clone())).await {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => return Err(FetchError::EngineLaunch { reason: format!("{:#}", e) }),
            Err(_) => {
                return Err(FetchError::EngineLaunch {
                    reason: format!("no browser after {:?}", self.launch_ceiling()),
                })
            }
        };

        let rendered = timeout(self.render_ceiling(), session.render(url)).await;

        // Release the browser before looking at the outcome
        session.close().await;

        let (final_url, content) = match rendered {
            Ok(Ok(rendered)) => rendered,
            Ok(Err(e)) => {
                return Err(FetchError::Navigation {
                    url: url.to_string(),
                    reason: format!("{:#}", e),
                })
            }
            Err(_) => {
                return Err(FetchError::Timeout {
                    url: url.to_string(),
                    after: self.render_ceiling(),
                })
            }
        };

        let links = html::anchor_hrefs(&content);
        debug!("Rendered {} with {} anchors", final_url, links.len());

        Ok(Page {
            url: final_url,
            content,
            links,
        })
    }

    fn renders_scripts(&self) -> bool {
        true
    }
}

use anyhow::{Result, Context};
use thirtyfour::prelude::*;
use std::time::Duration;
use tracing::{debug, error};

use crate::cli::config::BrowserSettings;

/// One WebDriver-controlled browser, alive for a single page render
pub struct BrowserSession {
    /// Browser settings
    config: BrowserSettings,

    /// WebDriver instance
    driver: Option<WebDriver>,
}

impl BrowserSession {
    /// Start a browser through the configured WebDriver endpoint
    pub async fn launch(config: BrowserSettings) -> Result<Self> {
        // Create WebDriver capabilities
        let mut caps = DesiredCapabilities::chrome();

        // Set headless mode if configured
        if config.headless {
            caps.set_headless()?;
        }

        for arg in &config.chrome_args {
            caps.add_chrome_arg(arg)?;
        }

        // Connect to WebDriver
        let driver = WebDriver::new(&config.webdriver_url, caps).await
            .context(format!("Failed to connect to WebDriver at {}", config.webdriver_url))?;

        // Set page load timeout; the browser is already up, so quit it on failure
        let page_load_timeout = Duration::from_secs(config.page_load_timeout_secs);
        let timeout_set = driver.set_page_load_timeout(page_load_timeout).await;
        if let Err(e) = timeout_set {
            if let Err(quit_err) = driver.quit().await {
                error!("Error closing browser session after failed setup: {}", quit_err);
            }
            return Err(e).context("Failed to set page load timeout");
        }

        debug!("Browser session started via {}", config.webdriver_url);

        Ok(Self {
            config,
            driver: Some(driver),
        })
    }

    /// Navigate to a URL, let scripts settle, and return the rendered markup
    /// along with the URL the browser ended up on
    pub async fn render(&self, url: &str) -> Result<(String, String)> {
        let driver = self.driver.as_ref()
            .context("Browser session already closed")?;

        debug!("Navigating to: {}", url);
        driver.goto(url).await
            .context(format!("Failed to navigate to URL: {}", url))?;

        // Give client-side scripts time to build the page
        tokio::time::sleep(Duration::from_millis(self.config.settle_ms)).await;

        let current = driver.current_url().await
            .map(|u| u.to_string())
            .unwrap_or_else(|_| url.to_string());

        let source = driver.source().await
            .context("Failed to get page source")?;

        Ok((current, source))
    }

    /// Close the browser session
    pub async fn close(&mut self) {
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.quit().await {
                error!("Error closing browser session: {}", e);
            }
            debug!("Browser session closed");
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Reached when a render is abandoned mid-flight, e.g. on timeout
        if let Some(driver) = self.driver.take() {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if let Err(e) = driver.quit().await {
                        error!("Error closing browser session during drop: {}", e);
                    }
                });
            }
        }
    }
}

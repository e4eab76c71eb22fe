use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use crate::cli::config::HarvesterConfig;
use crate::crawler::results::{ResultAggregator, SiteResult};
use crate::crawler::scheduler::{Scheduler, SchedulerOptions};
use crate::crawler::task::{CrawlJob, ExtractorKind, FetchStrategy, JobError};
use crate::extract::{build_extractor, Extractor};
use crate::fetch::{build_fetcher, Fetcher};

/// Runs one crawl job per seed and assembles the result table
pub struct CrawlerController {
    config: HarvesterConfig,
    kind: ExtractorKind,
    strategy: FetchStrategy,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
}

impl CrawlerController {
    /// Create a controller with the backend and extractor the job settings call for
    pub fn new(config: HarvesterConfig, kind: ExtractorKind, strategy: FetchStrategy) -> Result<Self> {
        let fetcher = build_fetcher(strategy, &config)?;
        let extractor: Arc<dyn Extractor> = Arc::from(build_extractor(kind, &config.extractor));

        Ok(Self::with_parts(config, kind, strategy, fetcher, extractor))
    }

    /// Create a controller around an existing fetcher and extractor
    pub fn with_parts(
        config: HarvesterConfig,
        kind: ExtractorKind,
        strategy: FetchStrategy,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        Self {
            config,
            kind,
            strategy,
            fetcher,
            extractor,
        }
    }

    /// Sites crawled at once; a rendering backend is limited to one
    fn site_concurrency(&self) -> usize {
        if self.fetcher.renders_scripts() {
            1
        } else {
            self.config.crawler.site_concurrency.max(1)
        }
    }

    /// Crawl every seed and return one result per seed, in seed order.
    ///
    /// A failing site is recorded as an error row and does not stop the batch.
    /// Once `cancel` fires no further site is started.
    pub async fn run(&self, seeds: &[String], cancel: &CancellationToken) -> Vec<SiteResult> {
        let total = seeds.len();
        let mut aggregator = ResultAggregator::new(total);

        info!(
            "Harvesting {} site(s) for {:?} with the {:?} fetcher",
            total, self.kind, self.strategy
        );

        let mut finished = stream::iter(seeds.iter().enumerate())
            .map(|(index, seed)| async move { (index, self.run_site(index, total, seed, cancel).await) })
            .buffer_unordered(self.site_concurrency());

        while let Some((index, result)) = finished.next().await {
            if let Some(result) = result {
                aggregator.record(index, result);
            }
        }

        if cancel.is_cancelled() {
            warn!("Harvest cancelled after {} of {} site(s)", aggregator.recorded(), total);
        }

        aggregator.finish()
    }

    async fn run_site(&self, index: usize, total: usize, seed: &str, cancel: &CancellationToken) -> Option<SiteResult> {
        if cancel.is_cancelled() {
            return None;
        }

        info!("[{}/{}] Harvesting {}", index + 1, total, seed);
        let started = Instant::now();

        let outcome = match CrawlJob::new(seed, self.config.crawler.max_depth, self.kind, self.strategy) {
            Ok(job) => {
                let options = SchedulerOptions::from_config(&self.config, self.fetcher.renders_scripts());
                let scheduler = Scheduler::new(options, self.fetcher.as_ref(), self.extractor.as_ref());
                scheduler
                    .run(&job, cancel)
                    .instrument(info_span!("site", seed = %seed))
                    .await
            }
            Err(e) => Err(e),
        };

        let result = match outcome {
            Ok(outcome) => {
                info!(
                    "[{}/{}] {}: {} value(s) in {:.2}s",
                    index + 1, total, seed, outcome.values.len(), started.elapsed().as_secs_f64()
                );
                SiteResult::completed(seed, outcome.values, started.elapsed())
            }
            Err(e @ JobError::Cancelled) => {
                warn!("[{}/{}] {}: {}", index + 1, total, seed, e);
                SiteResult::failed(seed, e)
            }
            Err(e) => {
                error!("[{}/{}] Failed to harvest {}: {}", index + 1, total, seed, e);
                SiteResult::failed(seed, e)
            }
        };

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::results::SiteStatus;
    use crate::extract::EmailExtractor;
    use crate::fetch::{FetchError, Page};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    /// Each host answers with its own content after its own delay; `hang.com` never answers
    struct HostFetcher {
        hosts: HashMap<&'static str, (&'static str, Duration)>,
        /// Cancel this token while serving the given host
        cancel_on: Option<(&'static str, CancellationToken)>,
    }

    #[async_trait]
    impl Fetcher for HostFetcher {
        async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
            let host = url::Url::parse(url).unwrap().host_str().unwrap().to_string();
            match self.hosts.get(host.as_str()) {
                Some((content, delay)) => {
                    tokio::time::sleep(*delay).await;
                    if let Some((trigger, token)) = &self.cancel_on {
                        if *trigger == host {
                            token.cancel();
                        }
                    }
                    Ok(Page {
                        url: url.to_string(),
                        content: content.to_string(),
                        links: vec![],
                    })
                }
                None => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Err(FetchError::Navigation { url: url.to_string(), reason: "unreachable".to_string() })
                }
            }
        }

        fn renders_scripts(&self) -> bool {
            false
        }
    }

    fn controller(site_concurrency: usize) -> CrawlerController {
        controller_cancelling_on(site_concurrency, None)
    }

    fn controller_cancelling_on(
        site_concurrency: usize,
        cancel_on: Option<(&'static str, CancellationToken)>,
    ) -> CrawlerController {
        let mut config = HarvesterConfig::default();
        config.crawler.politeness_delay = 0;
        config.crawler.fetch_timeout_secs = 1;
        config.crawler.site_concurrency = site_concurrency;

        let fetcher = HostFetcher {
            hosts: HashMap::from([
                ("a.com", ("hello@a.com", Duration::from_millis(300))),
                ("c.com", ("Contact: info@example.com and SALES@Example.com", Duration::from_millis(10))),
            ]),
            cancel_on,
        };

        CrawlerController::with_parts(
            config,
            ExtractorKind::Emails,
            FetchStrategy::Static,
            Arc::new(fetcher),
            Arc::new(EmailExtractor::new(vec!["contact".to_string()])),
        )
    }

    fn seeds() -> Vec<String> {
        vec!["https://a.com/".to_string(), "https://hang.com/".to_string(), "https://c.com/".to_string()]
    }

    #[tokio::test]
    async fn test_failing_site_is_isolated_and_order_kept() {
        for concurrency in [1, 3] {
            let results = controller(concurrency).run(&seeds(), &CancellationToken::new()).await;

            let sites: Vec<&str> = results.iter().map(|r| r.website.as_str()).collect();
            assert_eq!(sites, vec!["https://a.com/", "https://hang.com/", "https://c.com/"]);

            assert_eq!(results[0].values, vec!["hello@a.com"]);
            assert_eq!(results[1].status, SiteStatus::Error);
            assert_eq!(results[1].display_time(), "N/A");
            assert_eq!(results[2].values, vec!["SALES@Example.com", "info@example.com"]);
            assert!(results[2].elapsed_secs.is_some());
        }
    }

    #[tokio::test]
    async fn test_invalid_seed_becomes_error_row() {
        let seeds = vec!["ftp://files.example.com".to_string(), "https://c.com/".to_string()];
        let results = controller(1).run(&seeds, &CancellationToken::new()).await;

        assert_eq!(results.len(), 2);
        assert!(!results[0].is_ok());
        assert!(results[1].is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_batch_starts_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let results = controller(1).run(&seeds(), &cancel).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_mid_batch_keeps_finished_rows() {
        let cancel = CancellationToken::new();
        let controller = controller_cancelling_on(1, Some(("a.com", cancel.clone())));

        let seeds = vec!["https://c.com/".to_string(), "https://a.com/".to_string(), "https://hang.com/".to_string()];
        let results = controller.run(&seeds, &cancel).await;

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert_eq!(results[1].website, "https://a.com/");
        assert_eq!(results[1].status, SiteStatus::Error);
        assert_eq!(results[1].error.as_deref(), Some("crawl cancelled"));
    }
}

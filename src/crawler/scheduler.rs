use std::collections::BTreeSet;
use std::sync::Mutex;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::{sleep_until, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::cli::config::HarvesterConfig;
use crate::crawler::frontier::Frontier;
use crate::crawler::task::{CrawlJob, FrontierEntry, JobError};
use crate::extract::{Extractor, PageContext};
use crate::fetch::{FetchError, Fetcher};
use crate::utils::domain::site_domain;
use crate::utils::metrics::{Metrics, MetricsCollector};

/// Limits applied to every job
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Concurrent fetches within one job
    pub workers: usize,

    /// Minimum spacing between fetch starts against the job's site
    pub politeness_delay: Duration,

    /// Ceiling for a single fetch
    pub fetch_timeout: Duration,
}

impl SchedulerOptions {
    pub fn from_config(config: &HarvesterConfig, renders_scripts: bool) -> Self {
        // A rendered fetch may spend its whole launch, load and settle budget
        let fetch_timeout = if renders_scripts {
            Duration::from_secs(config.browser.launch_timeout_secs + config.browser.page_load_timeout_secs)
                + Duration::from_millis(config.browser.settle_ms)
                + Duration::from_secs(5)
        } else {
            Duration::from_secs(config.crawler.fetch_timeout_secs)
        };

        Self {
            workers: config.crawler.workers.max(1),
            politeness_delay: Duration::from_millis(config.crawler.politeness_delay),
            fetch_timeout,
        }
    }
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            workers: 5,
            politeness_delay: Duration::from_secs(1),
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

/// Values harvested by a finished job
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub values: BTreeSet<String>,
    pub metrics: Metrics,
}

/// Spaces out fetch starts against one site
struct Pacer {
    delay: Duration,
    next_slot: tokio::sync::Mutex<Instant>,
}

impl Pacer {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_slot: tokio::sync::Mutex::new(Instant::now()),
        }
    }

    async fn wait_turn(&self) {
        if self.delay.is_zero() {
            return;
        }

        // Holding the slot while sleeping queues workers up behind each other
        let mut next_slot = self.next_slot.lock().await;
        sleep_until(*next_slot).await;
        *next_slot = Instant::now() + self.delay;
    }
}

/// State owned by one running job and shared by its workers
struct JobState<'a> {
    job: &'a CrawlJob,
    frontier: Frontier,
    values: Mutex<BTreeSet<String>>,
    fatal: Mutex<Option<JobError>>,
    pacer: Pacer,
    metrics: MetricsCollector,
    cancel: CancellationToken,
}

impl JobState<'_> {
    fn abort(&self, err: JobError) {
        let mut fatal = self.fatal.lock().unwrap_or_else(|p| p.into_inner());
        if fatal.is_none() {
            *fatal = Some(err);
        }
        self.cancel.cancel();
    }
}

/// Runs a crawl job with a bounded pool of workers over the job's frontier
pub struct Scheduler<'a> {
    options: SchedulerOptions,
    fetcher: &'a dyn Fetcher,
    extractor: &'a dyn Extractor,
}

impl<'a> Scheduler<'a> {
    pub fn new(options: SchedulerOptions, fetcher: &'a dyn Fetcher, extractor: &'a dyn Extractor) -> Self {
        Self {
            options,
            fetcher,
            extractor,
        }
    }

    /// Worker count for this job; rendering keeps to one browser at a time
    fn worker_count(&self) -> usize {
        if self.fetcher.renders_scripts() {
            1
        } else {
            self.options.workers.max(1)
        }
    }

    /// Crawl a job until its frontier is exhausted
    pub async fn run(&self, job: &CrawlJob, cancel: &CancellationToken) -> Result<JobOutcome, JobError> {
        let state = JobState {
            job,
            frontier: Frontier::new(job),
            values: Mutex::new(BTreeSet::new()),
            fatal: Mutex::new(None),
            pacer: Pacer::new(self.options.politeness_delay),
            metrics: MetricsCollector::new(),
            cancel: cancel.child_token(),
        };

        let workers = self.worker_count();
        debug!("Crawling {} (domain {}, depth {}) with {} worker(s)", job.seed, job.domain, job.max_depth, workers);

        join_all((0..workers).map(|id| self.worker(id, &state))).await;

        if let Some(err) = state.fatal.lock().unwrap_or_else(|p| p.into_inner()).take() {
            return Err(err);
        }

        if cancel.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let metrics = state.metrics.get_metrics().await;
        info!(
            "Finished {}: {} page(s) fetched, {} failed, {} link(s) queued, avg fetch {} ms",
            job.seed, metrics.pages_fetched, metrics.pages_failed, metrics.links_enqueued, metrics.average_fetch_ms()
        );

        let values = state.values.into_inner().unwrap_or_else(|p| p.into_inner());
        Ok(JobOutcome { values, metrics })
    }

    async fn worker(&self, id: usize, state: &JobState<'_>) {
        while let Some(entry) = state.frontier.next(&state.cancel).await {
            self.process(id, state, entry).await;
            state.frontier.complete();
        }

        debug!("Worker {} for {} stopped", id, state.job.seed);
    }

    /// Fetch one entry, harvest it, and feed its links back to the frontier
    async fn process(&self, id: usize, state: &JobState<'_>, entry: FrontierEntry) {
        state.pacer.wait_turn().await;

        if state.cancel.is_cancelled() {
            return;
        }

        debug!("Worker {} fetching [depth {}]: {}", id, entry.depth, entry.url);

        let timer = state.metrics.start_timer();
        let fetched = match timeout(self.options.fetch_timeout, self.fetcher.fetch(entry.url.as_str())).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: entry.url.to_string(),
                after: self.options.fetch_timeout,
            }),
        };

        let page = match fetched {
            Ok(page) => page,
            Err(e) => {
                state.metrics.record_fetch(false, timer.end(), 0).await;

                match e {
                    FetchError::EngineLaunch { reason } => {
                        error!("Aborting {}: rendering engine could not start: {}", state.job.seed, reason);
                        state.abort(JobError::EngineLaunch(reason));
                    }
                    e if entry.depth == 0 => {
                        error!("Seed {} unreachable: {}", state.job.seed, e);
                        state.abort(JobError::SeedUnreachable(e));
                    }
                    e => warn!("Skipping {} (job {}): {}", entry.url, state.job.seed, e),
                }
                return;
            }
        };

        state.metrics.record_fetch(true, timer.end(), page.content.len()).await;

        let page_url = Url::parse(&page.url).unwrap_or_else(|_| entry.url.clone());

        // A redirect target counts as visited, or its own links would bring it back
        if page_url != entry.url && !state.frontier.reserve(&page_url) {
            debug!("{} redirected to already visited {}", entry.url, page_url);
        }
        let page_domain = site_domain(&page_url).unwrap_or_else(|| state.job.domain.clone());

        let found = self.extractor.extract(&PageContext {
            url: &page_url,
            domain: &page_domain,
            content: &page.content,
            links: &page.links,
        });

        if !found.is_empty() {
            debug!("{} value(s) on {}", found.len(), page_url);
            state.values.lock().unwrap_or_else(|p| p.into_inner()).extend(found);
        }

        if state.frontier.can_descend(entry.depth) {
            let accepted = page.links
                .iter()
                .filter(|href| state.frontier.offer(&page_url, href, entry.depth))
                .count();

            state.metrics.record_enqueued(accepted).await;
        }
    }
}

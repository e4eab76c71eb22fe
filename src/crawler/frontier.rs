use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::crawler::task::{CrawlJob, FrontierEntry};
use crate::utils::domain::{fetch_url, is_web_url, site_domain, visit_key};

/// Lifecycle of a job's frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontierState {
    /// Only the seed is queued, nothing dequeued yet
    Pending,
    /// Workers are dequeuing
    Active,
    /// Queue empty and no fetch in flight
    Done,
}

/// Result of a non-blocking dequeue attempt
#[derive(Debug, PartialEq, Eq)]
pub enum Next {
    Entry(FrontierEntry),
    /// Queue is empty but in-flight fetches may still add links
    Wait,
    Exhausted,
}

struct Inner {
    queue: VecDeque<FrontierEntry>,
    visited: HashSet<String>,
    in_flight: usize,
    state: FrontierState,
}

/// To-visit queue and visited set of one crawl job
///
/// A URL is reserved in the visited set at the moment it is accepted, so two
/// workers discovering the same link can never both fetch it.
pub struct Frontier {
    domain: String,
    max_depth: u32,
    inner: Mutex<Inner>,
    notify: Notify,
}

impl Frontier {
    /// Frontier holding only the job's seed at depth 0
    pub fn new(job: &CrawlJob) -> Self {
        let seed = fetch_url(&job.seed_url);

        let mut visited = HashSet::new();
        visited.insert(visit_key(&seed));

        let mut queue = VecDeque::new();
        queue.push_back(FrontierEntry { url: seed, depth: 0 });

        Self {
            domain: job.domain.clone(),
            max_depth: job.max_depth,
            inner: Mutex::new(Inner {
                queue,
                visited,
                in_flight: 0,
                state: FrontierState::Pending,
            }),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Bookkeeping never panics mid-update, so a poisoned lock still holds valid state
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> FrontierState {
        self.lock().state
    }

    /// Number of URLs reserved so far, seed included
    pub fn visited_count(&self) -> usize {
        self.lock().visited.len()
    }

    /// Whether links found at `depth` may still be followed
    pub fn can_descend(&self, depth: u32) -> bool {
        depth < self.max_depth
    }

    /// Dequeue the next entry without waiting
    pub fn try_next(&self) -> Next {
        let mut inner = self.lock();

        if let Some(entry) = inner.queue.pop_front() {
            inner.in_flight += 1;
            inner.state = FrontierState::Active;
            return Next::Entry(entry);
        }

        if inner.in_flight > 0 {
            Next::Wait
        } else {
            inner.state = FrontierState::Done;
            Next::Exhausted
        }
    }

    /// Dequeue the next entry, waiting while other workers may still discover links.
    ///
    /// Returns `None` once the frontier is exhausted or the token is cancelled.
    pub async fn next(&self, cancel: &CancellationToken) -> Option<FrontierEntry> {
        loop {
            // Register interest before checking so a wakeup in between is not lost
            let notified = self.notify.notified();

            if cancel.is_cancelled() {
                return None;
            }

            match self.try_next() {
                Next::Entry(entry) => return Some(entry),
                Next::Exhausted => {
                    self.notify.notify_waiters();
                    return None;
                }
                Next::Wait => {
                    tokio::select! {
                        _ = notified => {}
                        _ = cancel.cancelled() => return None,
                    }
                }
            }
        }
    }

    /// Offer a link found on a page at `parent_depth`.
    ///
    /// Resolution, scope check, visited check, reservation and enqueue happen
    /// under one lock. Returns whether the link was accepted.
    pub fn offer(&self, page_url: &Url, href: &str, parent_depth: u32) -> bool {
        let depth = parent_depth + 1;
        if depth > self.max_depth {
            return false;
        }

        let absolute = match page_url.join(href) {
            Ok(url) => url,
            Err(_) => return false,
        };

        if !is_web_url(&absolute) || site_domain(&absolute).as_deref() != Some(self.domain.as_str()) {
            return false;
        }

        let key = visit_key(&absolute);
        let url = fetch_url(&absolute);

        {
            let mut inner = self.lock();
            if !inner.visited.insert(key) {
                return false;
            }

            debug!("Queued [depth {}]: {}", depth, url);
            inner.queue.push_back(FrontierEntry { url, depth });
        }

        self.notify.notify_waiters();
        true
    }

    /// Record a URL reached without being offered, such as a redirect target.
    ///
    /// Returns whether the URL was new.
    pub fn reserve(&self, url: &Url) -> bool {
        self.lock().visited.insert(visit_key(url))
    }

    /// Mark a dequeued entry as finished, successfully or not
    pub fn complete(&self) {
        {
            let mut inner = self.lock();
            inner.in_flight = inner.in_flight.saturating_sub(1);

            if inner.in_flight == 0 && inner.queue.is_empty() {
                inner.state = FrontierState::Done;
            }
        }

        self.notify.notify_waiters();
    }
}

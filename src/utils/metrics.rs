use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

/// Per-job crawl metrics collector
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    /// In-memory metrics store
    metrics: Arc<Mutex<Metrics>>,
}

/// Metrics data structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Metrics {
    /// Start time of the metrics collection
    pub start_time: DateTime<Utc>,

    /// Pages fetched successfully
    pub pages_fetched: usize,

    /// Fetches that failed or timed out
    pub pages_failed: usize,

    /// Links accepted into the frontier
    pub links_enqueued: usize,

    /// Bytes of page content received
    pub bytes_downloaded: usize,

    /// Duration of every fetch in milliseconds
    pub fetch_durations: Vec<u64>,
}

impl Metrics {
    /// Mean fetch duration in milliseconds, zero when nothing was fetched
    pub fn average_fetch_ms(&self) -> u64 {
        if self.fetch_durations.is_empty() {
            return 0;
        }

        self.fetch_durations.iter().sum::<u64>() / self.fetch_durations.len() as u64
    }
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        let metrics = Metrics {
            start_time: Utc::now(),
            ..Default::default()
        };

        Self {
            metrics: Arc::new(Mutex::new(metrics)),
        }
    }

    /// Record a finished fetch
    pub async fn record_fetch(&self, success: bool, duration_ms: u64, bytes: usize) {
        let mut metrics = self.metrics.lock().await;

        if success {
            metrics.pages_fetched += 1;
        } else {
            metrics.pages_failed += 1;
        }

        metrics.bytes_downloaded += bytes;
        metrics.fetch_durations.push(duration_ms);
    }

    /// Record links accepted into the frontier
    pub async fn record_enqueued(&self, count: usize) {
        if count == 0 {
            return;
        }

        self.metrics.lock().await.links_enqueued += count;
    }

    /// Start timing a request
    pub fn start_timer(&self) -> RequestTimer {
        RequestTimer {
            start: Instant::now(),
        }
    }

    /// Get all metrics
    pub async fn get_metrics(&self) -> Metrics {
        self.metrics.lock().await.clone()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Request timer for measuring fetch durations
pub struct RequestTimer {
    /// Start time of the request
    start: Instant,
}

impl RequestTimer {
    /// End timing and get the duration in milliseconds
    pub fn end(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_fetch_counts() {
        let collector = MetricsCollector::new();

        collector.record_fetch(true, 100, 2048).await;
        collector.record_fetch(false, 300, 0).await;
        collector.record_enqueued(3).await;
        collector.record_enqueued(0).await;

        let metrics = collector.get_metrics().await;
        assert_eq!(metrics.pages_fetched, 1);
        assert_eq!(metrics.pages_failed, 1);
        assert_eq!(metrics.links_enqueued, 3);
        assert_eq!(metrics.bytes_downloaded, 2048);
        assert_eq!(metrics.average_fetch_ms(), 200);
    }

    #[test]
    fn test_average_of_nothing_is_zero() {
        assert_eq!(Metrics::default().average_fetch_ms(), 0);
    }
}

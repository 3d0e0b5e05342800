use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

/// Crawl metrics collector, shared by all workers
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    /// In-memory metrics store
    metrics: Arc<Mutex<Metrics>>,
}

/// Metrics data structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Metrics {
    /// Start time of the metrics collection
    pub start_time: DateTime<Utc>,

    /// Pages fetched successfully
    pub pages_fetched: usize,

    /// Fetches that failed (network, status, content type)
    pub fetch_failures: usize,

    /// Pages that could not be written to the blob store
    pub store_failures: usize,

    /// Bytes of page bodies downloaded
    pub bytes_downloaded: usize,

    /// Crawlable links seen on fetched pages
    pub links_discovered: usize,

    /// Links that were new and entered the frontier
    pub links_admitted: usize,

    /// Total time spent fetching, in milliseconds
    pub fetch_millis: u64,
}

impl Metrics {
    /// Mean fetch duration over all attempts, in milliseconds
    pub fn mean_fetch_millis(&self) -> u64 {
        let attempts = (self.pages_fetched + self.fetch_failures) as u64;
        if attempts == 0 {
            0
        } else {
            self.fetch_millis / attempts
        }
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

    /// Record a fetch attempt
    pub async fn record_fetch(&self, success: bool, duration_ms: u64, bytes: usize) {
        let mut metrics = self.metrics.lock().await;

        if success {
            metrics.pages_fetched += 1;
            metrics.bytes_downloaded += bytes;
        } else {
            metrics.fetch_failures += 1;
        }

        metrics.fetch_millis += duration_ms;
    }

    /// Record a failed blob store write
    pub async fn record_store_failure(&self) {
        self.metrics.lock().await.store_failures += 1;
    }

    /// Record the links found on one page and how many were admitted
    pub async fn record_links(&self, discovered: usize, admitted: usize) {
        let mut metrics = self.metrics.lock().await;
        metrics.links_discovered += discovered;
        metrics.links_admitted += admitted;
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

/// Request timer for measuring request durations
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

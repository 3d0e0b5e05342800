//! In-process collaborators for crawler tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::{ErrorKind, RedisError};
use tokio::sync::Notify;

use super::fetcher::{FetchError, PageFetcher};
use super::task::FetchedPage;
use crate::storage::{DedupError, DedupStore, MemoryDedupStore};

/// Serves a fixed link graph. Unknown URLs answer with a 404.
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, Vec<String>>,
    delays: HashMap<String, Duration>,
    hangs: HashSet<String>,
    counts: Mutex<HashMap<String, usize>>,
    hung: Notify,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, links: &[&str]) -> Self {
        self.pages
            .insert(url.to_string(), links.iter().map(|l| l.to_string()).collect());
        self
    }

    pub fn delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    /// Fetching `url` never completes
    pub fn hang(mut self, url: &str) -> Self {
        self.hangs.insert(url.to_string());
        self
    }

    /// Resolve once some fetch is stuck on a hanging URL
    pub async fn wait_until_hung(&self) {
        self.hung.notified().await;
    }

    /// Fetch attempts per URL, failures included
    pub fn fetch_counts(&self) -> HashMap<String, usize> {
        self.counts.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        *self.counts.lock().unwrap().entry(url.to_string()).or_default() += 1;

        if self.hangs.contains(url) {
            self.hung.notify_one();
            futures::future::pending::<()>().await;
        }

        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }

        let links = self
            .pages
            .get(url)
            .cloned()
            .ok_or(FetchError::Status { status: 404 })?;

        Ok(FetchedPage {
            url: url.to_string(),
            content_type: Some("text/html".to_string()),
            body: format!("<html>{}</html>", url),
            links,
            fetched_at: Utc::now(),
        })
    }
}

/// Dedup store whose every call fails as if Redis went away
pub struct FailingDedupStore;

impl FailingDedupStore {
    fn unavailable(op: &'static str) -> DedupError {
        DedupError::Command {
            op,
            source: RedisError::from((ErrorKind::IoError, "connection refused")),
        }
    }
}

#[async_trait]
impl DedupStore for FailingDedupStore {
    async fn exists_or_mark(&self, _url: &str) -> Result<bool, DedupError> {
        Err(Self::unavailable("SADD"))
    }

    async fn load_pending(&self) -> Result<Vec<String>, DedupError> {
        Err(Self::unavailable("LRANGE"))
    }

    async fn save_pending(&self, _urls: &[String]) -> Result<(), DedupError> {
        Err(Self::unavailable("RPUSH"))
    }

    async fn seen_count(&self) -> Result<usize, DedupError> {
        Err(Self::unavailable("SCARD"))
    }

    async fn pending_count(&self) -> Result<usize, DedupError> {
        Err(Self::unavailable("LLEN"))
    }

    async fn clear(&self) -> Result<(), DedupError> {
        Err(Self::unavailable("DEL"))
    }
}

/// In-memory store that stalls after each mark, widening the window between
/// recording a URL and queueing it
pub struct SlowMarkStore {
    inner: MemoryDedupStore,
    stall: Duration,
}

impl SlowMarkStore {
    pub fn new(stall: Duration) -> Self {
        Self {
            inner: MemoryDedupStore::new(),
            stall,
        }
    }
}

#[async_trait]
impl DedupStore for SlowMarkStore {
    async fn exists_or_mark(&self, url: &str) -> Result<bool, DedupError> {
        let inserted = self.inner.exists_or_mark(url).await?;
        tokio::time::sleep(self.stall).await;
        Ok(inserted)
    }

    async fn load_pending(&self) -> Result<Vec<String>, DedupError> {
        self.inner.load_pending().await
    }

    async fn save_pending(&self, urls: &[String]) -> Result<(), DedupError> {
        self.inner.save_pending(urls).await
    }

    async fn seen_count(&self) -> Result<usize, DedupError> {
        self.inner.seen_count().await
    }

    async fn pending_count(&self) -> Result<usize, DedupError> {
        self.inner.pending_count().await
    }

    async fn clear(&self) -> Result<(), DedupError> {
        self.inner.clear().await
    }
}

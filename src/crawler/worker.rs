use std::sync::Arc;
use tracing::{debug, warn};

use super::fetcher::PageFetcher;
use super::frontier::Frontier;
use crate::storage::{BlobStore, DedupError};
use crate::utils::MetricsCollector;

/// One fetch loop draining the shared frontier
pub struct Worker {
    pub id: usize,
    pub frontier: Arc<Frontier>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub pages: Arc<dyn BlobStore>,
    pub metrics: MetricsCollector,
}

impl Worker {
    /// Process URLs until the frontier is drained or closed.
    ///
    /// Returns the number of URLs this worker took off the frontier. Only a
    /// dedup store failure ends the loop early.
    pub async fn run(self) -> Result<usize, DedupError> {
        let mut processed = 0;

        while let Some(url) = self.frontier.next_task().await {
            let result = self.process(&url).await;

            // Release the slot before surfacing any error so siblings can finish
            self.frontier.complete().await;
            result?;

            processed += 1;
        }

        debug!(processed, "Frontier drained, worker exiting");
        Ok(processed)
    }

    async fn process(&self, url: &str) -> Result<(), DedupError> {
        debug!("Worker {} processing: {}", self.id, url);

        let timer = self.metrics.start_timer();
        let page = match self.fetcher.fetch(url).await {
            Ok(page) => page,
            Err(e) => {
                // Not retried; the dedup record stays in place
                warn!(%url, error = %e, "Fetch failed, skipping");
                self.metrics.record_fetch(false, timer.end(), 0).await;
                return Ok(());
            }
        };
        self.metrics.record_fetch(true, timer.end(), page.body.len()).await;

        if let Err(e) = self.pages.store_page(&page.url, &page.body).await {
            warn!(%url, error = %format!("{:#}", e), "Failed to store page");
            self.metrics.record_store_failure().await;
        }

        let admitted = self.frontier.enqueue_many(&page.links).await?;
        self.metrics.record_links(page.links.len(), admitted).await;

        debug!(discovered = page.links.len(), admitted, "Processed {}", url);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::testing::FakeFetcher;
    use crate::storage::blob::MockBlobStore;
    use crate::storage::MemoryDedupStore;
    use std::path::PathBuf;

    #[tokio::test]
    async fn single_worker_follows_links_breadth_first() {
        let frontier = Arc::new(Frontier::new(Arc::new(MemoryDedupStore::new())));
        frontier.enqueue_many(["http://root.test/"]).await.unwrap();

        let fetcher = Arc::new(
            FakeFetcher::new()
                .page("http://root.test/", &["http://a.test/", "http://b.test/"])
                .page("http://a.test/", &["http://c.test/"])
                .page("http://b.test/", &[])
                .page("http://c.test/", &[]),
        );

        let mut pages = MockBlobStore::new();
        let mut order = mockall::Sequence::new();
        for url in ["http://root.test/", "http://a.test/", "http://b.test/", "http://c.test/"] {
            pages
                .expect_store_page()
                .withf(move |stored, _| stored == url)
                .times(1)
                .in_sequence(&mut order)
                .returning(|stored, _| Ok(PathBuf::from(stored)));
        }

        let worker = Worker {
            id: 0,
            frontier: frontier.clone(),
            fetcher,
            pages: Arc::new(pages),
            metrics: MetricsCollector::new(),
        };

        assert_eq!(worker.run().await.unwrap(), 4);
        assert_eq!(frontier.in_flight().await, 0);
        assert!(frontier.is_empty().await);
    }
}

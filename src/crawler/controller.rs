use anyhow::{Result, Context};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, info_span, Instrument};

use crate::cli::config::{CrawlerConfig, CrawlerSettings};
use crate::crawler::fetcher::{HttpFetcher, PageFetcher};
use crate::crawler::frontier::Frontier;
use crate::crawler::shutdown::ShutdownHandle;
use crate::crawler::task::{CrawlOutcome, Seeded};
use crate::crawler::worker::Worker;
use crate::storage::{BlobStore, DedupError, DedupStore, DedupStoreFactory, FileSystemBlobStore};
use crate::utils::MetricsCollector;

pub struct CrawlerController {
    settings: CrawlerSettings,
    frontier: Arc<Frontier>,
    fetcher: Arc<dyn PageFetcher>,
    pages: Arc<dyn BlobStore>,
    metrics: MetricsCollector,
}

impl CrawlerController {
    /// Create a controller from configuration, restoring or seeding the frontier
    pub async fn new(config: &CrawlerConfig, seed_urls: &[String]) -> Result<(Self, Seeded)> {
        let store = DedupStoreFactory::create(&config.storage.dedup)
            .await
            .context("Failed to open dedup store")?;

        Self::with_store(config, store, seed_urls).await
    }

    /// Build every fallible component before touching the store: restoring
    /// consumes the persisted pending list, so nothing may fail after it
    pub async fn with_store(
        config: &CrawlerConfig,
        store: Arc<dyn DedupStore>,
        seed_urls: &[String],
    ) -> Result<(Self, Seeded)> {
        let fetcher = HttpFetcher::new(&config.crawler)
            .context("Failed to build HTTP client")?;

        let pages = FileSystemBlobStore::create(&config.storage.pages.dest_dir).await?;

        let (frontier, seeded) = Frontier::restore(store, seed_urls)
            .await
            .context("Failed to initialize frontier")?;

        let controller = Self::from_parts(
            config.crawler.clone(),
            Arc::new(frontier),
            Arc::new(fetcher),
            Arc::new(pages),
        );

        Ok((controller, seeded))
    }

    /// Assemble a controller from already-built components
    pub fn from_parts(
        settings: CrawlerSettings,
        frontier: Arc<Frontier>,
        fetcher: Arc<dyn PageFetcher>,
        pages: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            settings,
            frontier,
            fetcher,
            pages,
            metrics: MetricsCollector::new(),
        }
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Run the worker pool until the frontier drains or a shutdown is requested.
    ///
    /// Either way the frontier is flushed on the way out: after a full drain
    /// this clears any stale checkpoint, after an interrupt it saves the URLs
    /// still pending. A dedup store failure in any worker aborts the run.
    pub async fn run(&self, shutdown: &ShutdownHandle) -> Result<CrawlOutcome> {
        let worker_count = self.settings.workers.max(1);
        info!("Starting {} workers", worker_count);

        let mut workers = self.spawn_workers(worker_count);

        let finished = tokio::select! {
            result = Self::join_workers(&mut workers) => Some(result),
            _ = shutdown.requested() => None,
        };

        match finished {
            Some(Ok(pages)) => {
                self.frontier
                    .flush_to_persistent_store()
                    .await
                    .context("Failed to clear persisted pending list")?;

                info!(pages, "Frontier drained, crawl complete");
                Ok(CrawlOutcome::Completed { pages })
            }
            Some(Err(e)) => {
                workers.abort_all();
                Err(e)
            }
            None => {
                self.frontier.close().await;

                let persisted = match self.frontier.flush_to_persistent_store().await {
                    Ok(count) => count,
                    Err(e) => {
                        // Best effort: nothing left to retry with
                        error!(error = %e, "Failed to persist pending URLs");
                        0
                    }
                };

                // In-flight fetches are dropped, not awaited
                workers.abort_all();
                shutdown.terminate();

                info!(persisted, "Pending URLs saved for the next run");
                Ok(CrawlOutcome::Interrupted { persisted })
            }
        }
    }

    fn spawn_workers(&self, count: usize) -> JoinSet<Result<usize, DedupError>> {
        let mut workers = JoinSet::new();

        for id in 0..count {
            let worker = Worker {
                id,
                frontier: self.frontier.clone(),
                fetcher: self.fetcher.clone(),
                pages: self.pages.clone(),
                metrics: self.metrics.clone(),
            };

            workers.spawn(worker.run().instrument(info_span!("worker", id)));
        }

        workers
    }

    /// Wait for every worker, failing fast on the first fatal error
    async fn join_workers(workers: &mut JoinSet<Result<usize, DedupError>>) -> Result<usize> {
        let mut pages = 0;

        while let Some(joined) = workers.join_next().await {
            let processed = joined
                .context("Worker task panicked")?
                .context("Dedup store failure, aborting crawl")?;
            pages += processed;
        }

        Ok(pages)
    }
}

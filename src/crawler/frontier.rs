//! FIFO crawl frontier with store-backed, lifetime-scoped deduplication.
//!
//! Every URL passes through [`DedupStore::exists_or_mark`] before it is queued,
//! so a URL is admitted at most once for the lifetime of the store, across
//! restarts. On shutdown the queue is checkpointed with
//! [`Frontier::flush_to_persistent_store`] and the next run picks it up through
//! [`Frontier::restore`].

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

use super::admission::is_crawlable;
use super::task::Seeded;
use crate::storage::{DedupError, DedupStore};

#[derive(Default)]
struct FrontierState {
    queue: VecDeque<String>,
    /// URLs handed out by `next_task` and not yet completed
    in_flight: usize,
    closed: bool,
}

/// Shared queue of URLs awaiting fetch.
pub struct Frontier {
    store: Arc<dyn DedupStore>,
    state: Mutex<FrontierState>,
    /// Signalled on every enqueue, completion and close
    changed: Notify,
}

impl Frontier {
    /// Create an empty frontier over `store`.
    pub fn new(store: Arc<dyn DedupStore>) -> Self {
        Self {
            store,
            state: Mutex::new(FrontierState::default()),
            changed: Notify::new(),
        }
    }

    /// Build a frontier from the store's persisted pending list, or from
    /// `seed_urls` when nothing was persisted.
    pub async fn restore(
        store: Arc<dyn DedupStore>,
        seed_urls: &[String],
    ) -> Result<(Self, Seeded), DedupError> {
        let resume_state = store.load_pending().await?;
        let frontier = Self::new(store);
        let seeded = frontier.initialize(seed_urls, resume_state).await?;
        Ok((frontier, seeded))
    }

    /// Populate the frontier from exactly one source.
    ///
    /// A non-empty `resume_state` wins and `seed_urls` are ignored. Resumed URLs
    /// were recorded when first admitted and are queued as-is; seeds go through
    /// the normal admission path, so a seed already recorded by an earlier run
    /// is skipped.
    pub async fn initialize(
        &self,
        seed_urls: &[String],
        resume_state: Vec<String>,
    ) -> Result<Seeded, DedupError> {
        if !resume_state.is_empty() {
            let count = resume_state.len();
            if !seed_urls.is_empty() {
                info!(ignored = seed_urls.len(), "Resuming previous run, seed URLs ignored");
            }

            let mut state = self.state.lock().await;
            state.queue.extend(resume_state);
            drop(state);
            self.changed.notify_waiters();

            info!(count, "Frontier restored from persisted pending list");
            return Ok(Seeded::Resumed(count));
        }

        let admitted = self.enqueue_many(seed_urls).await?;
        if admitted < seed_urls.len() {
            warn!(
                skipped = seed_urls.len() - admitted,
                "Some seed URLs were rejected or already recorded by an earlier run"
            );
        }

        info!(count = admitted, "Frontier seeded");
        Ok(Seeded::Fresh(admitted))
    }

    /// Remove and return the head URL without waiting.
    pub async fn dequeue(&self) -> Option<String> {
        self.state.lock().await.queue.pop_front()
    }

    /// Take the next URL for a worker, counting it as in flight.
    ///
    /// When the queue is empty but siblings still hold in-flight URLs, waits
    /// for them to either enqueue more work or complete. Returns `None` once
    /// the queue is empty with nothing in flight, or after [`Frontier::close`].
    pub async fn next_task(&self) -> Option<String> {
        loop {
            // Register interest before inspecting state so a notification sent
            // between the check and the await is not missed.
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if state.closed {
                    return None;
                }

                if let Some(url) = state.queue.pop_front() {
                    state.in_flight += 1;
                    return Some(url);
                }

                if state.in_flight == 0 {
                    drop(state);
                    self.changed.notify_waiters();
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Release the in-flight slot taken by [`Frontier::next_task`].
    pub async fn complete(&self) {
        let mut state = self.state.lock().await;
        state.in_flight = state.in_flight.saturating_sub(1);
        drop(state);
        self.changed.notify_waiters();
    }

    /// Admit each crawlable, never-recorded URL in order. Returns how many
    /// were appended.
    ///
    /// The closed check, the store mark and the push happen under one hold of
    /// the queue lock, so a concurrent flush sees every URL that was marked.
    pub async fn enqueue_many<I, S>(&self, urls: I) -> Result<usize, DedupError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut admitted = 0;

        for url in urls {
            let url = url.as_ref();
            if !is_crawlable(url) {
                debug!(%url, "Discarding non-crawlable URL");
                continue;
            }

            let mut state = self.state.lock().await;
            if state.closed {
                debug!("Frontier closed, dropping remaining discovered links");
                break;
            }

            if !self.store.exists_or_mark(url).await? {
                continue;
            }

            state.queue.push_back(url.to_string());
            drop(state);

            admitted += 1;
            self.changed.notify_waiters();
        }

        Ok(admitted)
    }

    /// Replace the persisted pending list with the current queue, head first.
    ///
    /// The queue lock is held for the duration of the write so the checkpoint
    /// matches the queue exactly. An empty queue clears the persisted list.
    pub async fn flush_to_persistent_store(&self) -> Result<usize, DedupError> {
        let state = self.state.lock().await;
        let pending: Vec<String> = state.queue.iter().cloned().collect();

        self.store.save_pending(&pending).await?;

        debug!(count = pending.len(), "Flushed frontier to persistent store");
        Ok(pending.len())
    }

    /// Stop handing out work and stop admitting new URLs.
    pub async fn close(&self) {
        self.state.lock().await.closed = true;
        self.changed.notify_waiters();
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.queue.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.queue.is_empty()
    }

    pub async fn in_flight(&self) -> usize {
        self.state.lock().await.in_flight
    }
}

//! Resumable breadth-first web crawler.
//!
//! The [`crawler::Frontier`] decides which URLs are ever fetched: each URL is
//! admitted at most once for the lifetime of the [`storage::DedupStore`], and
//! the pending queue is checkpointed to the same store on interrupt so the
//! next run resumes where this one stopped.

pub mod cli;
pub mod crawler;
pub mod storage;
pub mod utils;

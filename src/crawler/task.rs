use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A page returned by the fetcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedPage {
    /// URL that was fetched
    pub url: String,

    /// Content type reported by the server, if any
    pub content_type: Option<String>,

    /// Raw body of the page
    pub body: String,

    /// Crawlable links discovered on the page, in document order
    pub links: Vec<String>,

    /// Timestamp when the page was fetched
    pub fetched_at: DateTime<Utc>,
}

/// How a crawl run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CrawlOutcome {
    /// Every admitted URL was processed
    Completed { pages: usize },

    /// The run was interrupted; `persisted` URLs were checkpointed for resume
    Interrupted { persisted: usize },
}

/// Where the frontier's initial contents came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seeded {
    /// Restored from the persisted pending list
    Resumed(usize),

    /// Admitted from the seed URLs
    Fresh(usize),
}

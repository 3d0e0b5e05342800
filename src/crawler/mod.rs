pub mod admission;
pub mod controller;
pub mod fetcher;
pub mod frontier;
pub mod parser;
pub mod shutdown;
pub mod task;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

// Re-export common types
pub use controller::CrawlerController;
pub use frontier::Frontier;
pub use shutdown::ShutdownHandle;
pub use task::{CrawlOutcome, FetchedPage, Seeded};

pub mod blob;
pub mod dedup;

// Re-export common types
pub use blob::{BlobStore, FileSystemBlobStore};
pub use dedup::{DedupError, DedupStore, DedupStoreFactory, MemoryDedupStore, RedisDedupStore};

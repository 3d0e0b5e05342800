use anyhow::{Result, Context};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Trait for fetched page storage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a page body under a key derived from its URL, returning where it went
    async fn store_page(&self, url: &str, body: &str) -> Result<PathBuf>;
}

/// Stores each page as a file in a destination directory
pub struct FileSystemBlobStore {
    dest: PathBuf,
}

impl FileSystemBlobStore {
    /// Open the store, creating the destination directory if it is absent
    pub async fn create(dest: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(dest)
            .await
            .context(format!("Failed to create destination directory: {}", dest.display()))?;

        debug!("Storing pages under: {}", dest.display());

        Ok(Self {
            dest: dest.to_path_buf(),
        })
    }

    /// File name for a URL: every '/' becomes '.'
    pub fn file_name(url: &str) -> String {
        url.replace('/', ".")
    }
}

#[async_trait]
impl BlobStore for FileSystemBlobStore {
    async fn store_page(&self, url: &str, body: &str) -> Result<PathBuf> {
        let path = self.dest.join(Self::file_name(url));

        tokio::fs::write(&path, body)
            .await
            .context(format!("Failed to write page for {} to {}", url, path.display()))?;

        debug!("Stored page for URL: {}", url);

        Ok(path)
    }
}

//! Blob storage boundary for cached avatar bodies and meta files.

use std::io;
use std::path::Path;

use async_trait::async_trait;

/// Key-value blob storage under an extension-private directory.
///
/// The cache is written against this trait so tests can substitute
/// in-memory or failure-injecting stores. All paths are absolute, rooted at
/// the cache's configured storage root.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;
    async fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    async fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
}

/// The production store: plain `tokio::fs`.
#[derive(Debug, Default)]
pub struct FsBlobStore;

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        tokio::fs::write(path, data).await
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }

    async fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        match tokio::fs::remove_dir_all(path).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

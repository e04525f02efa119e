//! Filesystem blob store
//!
//! Keys are slash-separated paths rooted at the configured blob directory.
//! Keys are validated against traversal before touching the filesystem.

use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use super::{BlobStore, ProviderError};

pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, ProviderError> {
        let relative = Path::new(key);
        let traversal = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if traversal || key.is_empty() {
            return Err(ProviderError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid storage key: {}", key),
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, content: &[u8]) -> Result<(), ProviderError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, content).await?;

        tracing::debug!(key = %key, bytes = content.len(), "Blob stored");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ProviderError> {
        let path = self.resolve(key)?;
        Ok(fs::read(&path).await?)
    }

    async fn presign(&self, key: &str) -> Result<String, ProviderError> {
        let path = self.resolve(key)?;
        Ok(format!("file://{}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_rejects_traversal() {
        let store = FsBlobStore::new("/tmp/blobs");
        assert!(store.resolve("../etc/passwd").is_err());
        assert!(store.resolve("/etc/passwd").is_err());
        assert!(store.resolve("").is_err());
    }

    #[test]
    fn test_resolve_joins_under_root() {
        let store = FsBlobStore::new("/tmp/blobs");
        let path = store.resolve("claims/1/originals/a.pdf").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/blobs/claims/1/originals/a.pdf"));
    }
}

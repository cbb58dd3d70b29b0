//! Blob store contract and filesystem implementation

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Opaque blob store contract
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write bytes under a storage reference, overwriting any prior blob.
    ///
    /// The write must be complete before this returns: callers rely on the
    /// blob being durable before they index it.
    async fn write(&self, storage_ref: &str, bytes: &[u8]) -> Result<()>;

    /// Read the bytes stored under a reference
    async fn read(&self, storage_ref: &str) -> Result<Vec<u8>>;
}

/// Filesystem blob store rooted at a configured directory
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Create a blob store rooted at `root`, creating the directory if needed
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn path_for(&self, storage_ref: &str) -> Result<PathBuf> {
        // References are derived from prompts; refuse anything that would
        // escape the blob directory.
        let name = Path::new(storage_ref);
        if storage_ref.is_empty()
            || name.components().count() != 1
            || storage_ref.contains("..")
        {
            return Err(Error::Storage(format!(
                "invalid storage reference: {storage_ref:?}"
            )));
        }
        Ok(self.root.join(storage_ref))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn write(&self, storage_ref: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(storage_ref)?;
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(storage_ref, size = bytes.len(), "blob written");
        Ok(())
    }

    async fn read(&self, storage_ref: &str) -> Result<Vec<u8>> {
        let path = self.path_for(storage_ref)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound(format!(
                "no blob at reference {storage_ref:?}"
            ))),
            Err(e) => Err(e.into()),
        }
    }
}

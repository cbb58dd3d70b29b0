//! Image generation pipeline

use super::index::ArtifactIndex;
use super::types::{storage_ref, ImageArtifact};
use super::url_log::PromptUrlLog;
use crate::backend::{ByteFetcher, ImageGenerator};
use crate::config::DeadlineConfig;
use crate::deadline::run_with_deadline;
use crate::error::{Error, Result};
use crate::storage::BlobStore;
use std::sync::Arc;

/// Drives the image backend and commits results to durable storage.
///
/// Ordering invariant: the blob is written before the metadata record is
/// inserted. A crash between the two leaves an orphan blob, never a record
/// pointing at bytes that were not stored.
pub struct ImagePipeline {
    generator: Arc<dyn ImageGenerator>,
    fetcher: Arc<dyn ByteFetcher>,
    blobs: Arc<dyn BlobStore>,
    index: Arc<ArtifactIndex>,
    deadlines: DeadlineConfig,
}

impl ImagePipeline {
    /// Create a pipeline over injected collaborators
    pub fn new(
        generator: Arc<dyn ImageGenerator>,
        fetcher: Arc<dyn ByteFetcher>,
        blobs: Arc<dyn BlobStore>,
        index: Arc<ArtifactIndex>,
        deadlines: DeadlineConfig,
    ) -> Self {
        Self {
            generator,
            fetcher,
            blobs,
            index,
            deadlines,
        }
    }

    fn validate(prompt: &str) -> Result<()> {
        if prompt.trim().is_empty() {
            return Err(Error::Validation("empty image prompt".to_string()));
        }
        Ok(())
    }

    /// Generate an image for `prompt`, persist it, and return the bytes plus
    /// the indexed record so the caller can reply with the binary inline.
    ///
    /// An empty prompt is rejected before any remote call is spent on it.
    pub async fn generate_and_store(&self, prompt: &str) -> Result<(Vec<u8>, ImageArtifact)> {
        Self::validate(prompt)?;

        let url =
            run_with_deadline(self.deadlines.medium(), self.generator.generate(prompt)).await?;
        let bytes = self.fetcher.fetch(&url).await?;

        let storage_ref = storage_ref(prompt);
        self.blobs.write(&storage_ref, &bytes).await?;
        let record = self.index.insert(prompt, &storage_ref).await?;

        Ok((bytes, record))
    }

    /// Lightweight variant: generate and record only the prompt → URL
    /// mapping, skipping fetch, blob, and index entirely.
    pub async fn generate_url_only(&self, prompt: &str, log: &PromptUrlLog) -> Result<String> {
        Self::validate(prompt)?;

        let url =
            run_with_deadline(self.deadlines.medium(), self.generator.generate(prompt)).await?;
        log.record(prompt, &url).await?;
        Ok(url)
    }

    /// Read back the blob for a previously stored record
    pub async fn load_blob(&self, record: &ImageArtifact) -> Result<Vec<u8>> {
        self.blobs.read(&record.storage_ref).await
    }
}

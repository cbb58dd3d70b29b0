//! Artifact metadata index persisted as a JSON document
//!
//! Records live in insertion order in a single `images.json` under the data
//! directory, guarded by an `RwLock`. IDs are store-assigned and keep
//! increasing across restarts (next = highest existing + 1), so a deleted
//! ID is never reused.

use super::types::ImageArtifact;
use crate::error::{Error, Result};
use std::path::PathBuf;
use tokio::sync::RwLock;

const INDEX_FILE: &str = "images.json";

/// CRUD surface over persisted image metadata
pub struct ArtifactIndex {
    path: PathBuf,
    records: RwLock<Vec<ImageArtifact>>,
}

impl ArtifactIndex {
    /// Open the index under `data_dir`, loading any existing records
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(&data_dir).await?;
        let path = data_dir.join(INDEX_FILE);

        let records = match tokio::fs::read_to_string(&path).await {
            Ok(json) => serde_json::from_str(&json)
                .map_err(|e| Error::Storage(format!("corrupt artifact index: {e}")))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    /// Insert a new record, assigning the next ID, and return it.
    ///
    /// Callers must have completed the blob write for `storage_ref` before
    /// inserting; the index never learns about blobs that are not durable.
    pub async fn insert(&self, prompt: &str, storage_ref: &str) -> Result<ImageArtifact> {
        let mut records = self.records.write().await;
        let next_id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let record = ImageArtifact {
            id: next_id,
            prompt: prompt.to_string(),
            storage_ref: storage_ref.to_string(),
            created_at: chrono::Utc::now(),
        };

        // Persist first: the in-memory view must never get ahead of the file.
        let mut updated = records.clone();
        updated.push(record.clone());
        self.persist(&updated).await?;
        *records = updated;

        tracing::info!(id = record.id, storage_ref, "image record indexed");
        Ok(record)
    }

    /// List all records as (1-based display index, prompt) in insertion order.
    ///
    /// The display index is positional and independent of `id`; it shifts
    /// when earlier records are deleted.
    pub async fn list(&self) -> Vec<(usize, String)> {
        self.records
            .read()
            .await
            .iter()
            .enumerate()
            .map(|(i, r)| (i + 1, r.prompt.clone()))
            .collect()
    }

    /// Get a record by its store-assigned ID
    pub async fn get(&self, id: u64) -> Option<ImageArtifact> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// Delete a record by ID.
    ///
    /// Only the metadata row is removed; the blob stays behind. Returns
    /// `NotFound` for an unknown ID.
    pub async fn delete(&self, id: u64) -> Result<()> {
        let mut records = self.records.write().await;
        let remaining: Vec<ImageArtifact> =
            records.iter().filter(|r| r.id != id).cloned().collect();
        if remaining.len() == records.len() {
            return Err(Error::NotFound(format!("no image record with id {id}")));
        }

        // Persist first, as in insert.
        self.persist(&remaining).await?;
        *records = remaining;

        tracing::info!(id, "image record deleted");
        Ok(())
    }

    async fn persist(&self, records: &[ImageArtifact]) -> Result<()> {
        let json = serde_json::to_string_pretty(records)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

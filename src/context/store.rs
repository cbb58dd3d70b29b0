//! Durable per-conversation transcript store over a key-value backend

use super::types::ChatMessage;
use crate::error::{Error, Result};
use crate::storage::KvStore;
use std::sync::Arc;

const KEY_PREFIX: &str = "context:";

/// Durable store of per-conversation transcripts.
///
/// Transcripts are serialized as JSON arrays under `context:<key>`. An
/// existing transcript always contains at least the system preamble written
/// by `begin`; `append` refuses to create a transcript implicitly.
pub struct ContextStore {
    kv: Arc<dyn KvStore>,
    system_preamble: String,
}

impl ContextStore {
    /// Create a store over an injected key-value backend
    pub fn new(kv: Arc<dyn KvStore>, system_preamble: impl Into<String>) -> Self {
        Self {
            kv,
            system_preamble: system_preamble.into(),
        }
    }

    fn kv_key(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }

    /// Begin a conversation: write a one-element transcript holding the
    /// system preamble, unconditionally overwriting any prior transcript.
    pub async fn begin(&self, key: &str) -> Result<()> {
        let transcript = vec![ChatMessage::system(self.system_preamble.clone())];
        self.save(key, &transcript).await?;
        tracing::info!(conversation = key, "conversation context started");
        Ok(())
    }

    /// Append a message to an existing transcript.
    ///
    /// Fails with `NotFound` when no transcript exists for `key`; callers
    /// distinguish stateless from contextful mode via `try_load` first.
    pub async fn append(&self, key: &str, message: ChatMessage) -> Result<()> {
        let mut transcript = self
            .try_load(key)
            .await?
            .ok_or_else(|| Error::NotFound(format!("no conversation context for {key:?}")))?;
        transcript.push(message);
        self.save(key, &transcript).await
    }

    /// Load the full ordered transcript, or `None` when absent
    pub async fn try_load(&self, key: &str) -> Result<Option<Vec<ChatMessage>>> {
        match self.kv.get(&Self::kv_key(key)).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Persist a transcript as a full overwrite
    pub async fn save(&self, key: &str, transcript: &[ChatMessage]) -> Result<()> {
        let json = serde_json::to_string(transcript)?;
        self.kv.set(&Self::kv_key(key), &json).await
    }

    /// End a conversation, deleting its transcript. Idempotent.
    pub async fn end(&self, key: &str) -> Result<()> {
        self.kv.delete(&Self::kv_key(key)).await?;
        tracing::info!(conversation = key, "conversation context ended");
        Ok(())
    }
}

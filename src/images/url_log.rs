//! Lightweight prompt → URL log (key-value deployment variant)
//!
//! Stores only the remote URL a prompt generated, no binary. A repeated
//! prompt overwrites its earlier entry. The whole log can be wiped in one
//! call, with no confirmation and no undo.

use crate::error::Result;
use crate::storage::KvStore;
use std::sync::Arc;

const KEY_PREFIX: &str = "image-url:";

/// Prompt → URL log over an injected key-value store
pub struct PromptUrlLog {
    kv: Arc<dyn KvStore>,
}

impl PromptUrlLog {
    /// Create a log over a key-value backend
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    fn kv_key(prompt: &str) -> String {
        format!("{KEY_PREFIX}{prompt}")
    }

    /// Record the URL generated for a prompt, overwriting any earlier URL
    pub async fn record(&self, prompt: &str, url: &str) -> Result<()> {
        self.kv.set(&Self::kv_key(prompt), url).await
    }

    /// Get the URL last generated for a prompt
    pub async fn get(&self, prompt: &str) -> Result<Option<String>> {
        self.kv.get(&Self::kv_key(prompt)).await
    }

    /// Enumerate all (prompt, url) entries
    pub async fn entries(&self) -> Result<Vec<(String, String)>> {
        let mut entries = Vec::new();
        for key in self.kv.list_keys().await? {
            let Some(prompt) = key.strip_prefix(KEY_PREFIX) else {
                continue;
            };
            if let Some(url) = self.kv.get(&key).await? {
                entries.push((prompt.to_string(), url));
            }
        }
        Ok(entries)
    }

    /// Wipe every entry unconditionally
    pub async fn clear_all(&self) -> Result<()> {
        for key in self.kv.list_keys().await? {
            if key.starts_with(KEY_PREFIX) {
                self.kv.delete(&key).await?;
            }
        }
        tracing::info!("prompt URL log cleared");
        Ok(())
    }
}

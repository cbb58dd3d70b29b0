//! Remote generation backends
//!
//! The core consumes the text- and image-generation services as opaque
//! functions behind trait objects, so the orchestrator and pipeline never see
//! wire formats and tests can substitute scripted fakes.

mod openai;

use crate::context::ChatMessage;
use crate::error::Result;
use async_trait::async_trait;

pub use openai::{HttpFetcher, OpenAiClient};

/// Text-generation backend: ordered transcript in, reply text out
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for the given transcript
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Image-generation backend: prompt in, remote URL out
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate an image and return the URL it can be fetched from
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Fetcher for the bytes behind a generated-image URL
#[async_trait]
pub trait ByteFetcher: Send + Sync {
    /// Download the bytes at `url`
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

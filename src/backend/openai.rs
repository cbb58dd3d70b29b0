//! OpenAI-compatible HTTP backend (`/v1/chat/completions`, `/v1/images/generations`)
//!
//! Wire types are private to this module; callers only see the
//! `TextGenerator` / `ImageGenerator` traits. The client carries no timeout
//! of its own — deadlines are applied by the caller through
//! `deadline::run_with_deadline`, so a budget change never requires
//! rebuilding the client.

use super::{ByteFetcher, ImageGenerator, TextGenerator};
use crate::config::BackendConfig;
use crate::context::ChatMessage;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Client for any endpoint implementing the OpenAI REST surface.
///
/// Cheap to clone; `reqwest::Client` is an `Arc` internally.
#[derive(Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    chat_model: String,
    image_size: String,
    api_key: Option<String>,
}

impl OpenAiClient {
    /// Build a client from config, reading the API key from the configured
    /// environment variable. A missing key is allowed for keyless local
    /// servers.
    pub fn from_config(config: &BackendConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env).ok();
        if api_key.is_none() {
            tracing::warn!(
                env = %config.api_key_env,
                "no API key in environment, sending unauthenticated requests"
            );
        }
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            chat_model: config.chat_model.clone(),
            image_size: config.image_size.clone(),
            api_key,
        }
    }

    async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let mut req = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Backend(format!(
                "{path} returned {status}: {detail}"
            )));
        }
        response
            .json::<R>()
            .await
            .map_err(|e| Error::Backend(format!("malformed {path} payload: {e}")))
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        let payload = ChatCompletionRequest {
            model: self.chat_model.clone(),
            messages: messages.to_vec(),
        };
        tracing::debug!(model = %payload.model, turns = messages.len(), "sending chat completion request");

        let response: ChatCompletionResponse =
            self.post_json("/v1/chat/completions", &payload).await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Backend("chat completion returned no choices".to_string()))?;
        if content.is_empty() {
            return Err(Error::Backend(
                "chat completion returned empty content".to_string(),
            ));
        }
        Ok(content)
    }
}

#[async_trait]
impl ImageGenerator for OpenAiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let payload = ImageGenerationRequest {
            prompt: prompt.to_string(),
            n: 1,
            size: self.image_size.clone(),
        };
        tracing::debug!(size = %payload.size, "sending image generation request");

        let response: ImageGenerationResponse =
            self.post_json("/v1/images/generations", &payload).await?;
        response
            .data
            .into_iter()
            .next()
            .map(|d| d.url)
            .ok_or_else(|| Error::Backend("image generation returned no data".to_string()))
    }
}

/// Plain HTTP downloader for generated-image URLs
#[derive(Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with a default client
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ByteFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Network(format!("fetch of {url} failed: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::Network(format!(
                "fetch of {url} returned {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("fetch of {url} was interrupted: {e}")))?;
        Ok(bytes.to_vec())
    }
}

// Wire types

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Serialize)]
struct ImageGenerationRequest {
    prompt: String,
    n: u32,
    size: String,
}

#[derive(Deserialize)]
struct ImageGenerationResponse {
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    url: String,
}

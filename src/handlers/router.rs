//! Command routing and user-facing reply shaping

use crate::chat::ChatOrchestrator;
use crate::config::ArtifactMode;
use crate::error::{Error, Result};
use crate::images::{ArtifactIndex, ImagePipeline, PromptUrlLog};
use std::sync::Arc;

const GENERIC_FAILURE: &str = "Something went wrong with the assistant, please retry!";

const HELP_TEXT: &str = "Hello, I'm a smart assistant with conversational memory.\n\
    I have prepared some commands for you:\n\n\
    /start: Start a new conversation with memory\n\n\
    /end: Finish the current conversation\n\n\
    /image: Enter a prompt and I will generate an image for you, saved for later review\n\
    Example: /image a lovely cat\n\n\
    /image_log: List the history of generated images\n\n\
    /image_review: Enter the id of an image record to see the image again\n\
    Example: /image_review 4\n\n\
    /image_del: Delete an image record\n\n\
    /image_clear: Wipe the whole image log (URL-only mode)";

/// Reply returned to the transport layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Plain text reply
    Text(String),
    /// Binary image reply with a caption
    Photo { bytes: Vec<u8>, caption: String },
}

/// Routes recognized commands to the orchestrator and image pipeline.
///
/// All collaborators are injected at construction; the router owns no state
/// of its own beyond the configured artifact mode.
pub struct CommandRouter {
    orchestrator: Arc<ChatOrchestrator>,
    pipeline: Arc<ImagePipeline>,
    index: Arc<ArtifactIndex>,
    url_log: Arc<PromptUrlLog>,
    artifact_mode: ArtifactMode,
}

impl CommandRouter {
    /// Create a router over injected collaborators
    pub fn new(
        orchestrator: Arc<ChatOrchestrator>,
        pipeline: Arc<ImagePipeline>,
        index: Arc<ArtifactIndex>,
        url_log: Arc<PromptUrlLog>,
        artifact_mode: ArtifactMode,
    ) -> Self {
        Self {
            orchestrator,
            pipeline,
            index,
            url_log,
            artifact_mode,
        }
    }

    /// Handle one inbound message on the given conversation key.
    ///
    /// Never returns an error: validation problems produce a specific
    /// corrective reply, everything else is logged in full and masked behind
    /// one generic retry-prompting message. There are no automatic retries.
    pub async fn dispatch(&self, conversation_key: &str, input: &str) -> Reply {
        let input = input.trim();
        let (command, args) = match input.strip_prefix('/') {
            Some(rest) => {
                let mut parts = rest.splitn(2, char::is_whitespace);
                let command = parts.next().unwrap_or_default();
                (command, parts.next().unwrap_or("").trim())
            }
            None => ("", input),
        };

        let result = match command {
            "" => self.handle_chat(conversation_key, args).await,
            "help" => Ok(Reply::Text(HELP_TEXT.to_string())),
            "start" => self.handle_start(conversation_key).await,
            "end" => self.handle_end(conversation_key).await,
            "image" => self.handle_image(args).await,
            "image_log" => self.handle_image_log().await,
            "image_review" => self.handle_image_review(args).await,
            "image_del" => self.handle_image_del(args).await,
            "image_clear" => self.handle_image_clear().await,
            other => {
                tracing::debug!(command = other, "unrecognized command");
                Ok(Reply::Text(
                    "I don't know that command, try /help.".to_string(),
                ))
            }
        };

        match result {
            Ok(reply) => reply,
            Err(Error::Validation(detail)) => {
                tracing::debug!(command, detail = %detail, "rejected invalid argument");
                Reply::Text(detail)
            }
            Err(e) => {
                tracing::error!(command, error = %e, "command failed");
                Reply::Text(GENERIC_FAILURE.to_string())
            }
        }
    }

    async fn handle_chat(&self, key: &str, text: &str) -> Result<Reply> {
        let started = std::time::Instant::now();
        let reply = self.orchestrator.reply(key, text).await?;
        tracing::info!(
            conversation = key,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "chat completion finished"
        );
        Ok(Reply::Text(reply))
    }

    async fn handle_start(&self, key: &str) -> Result<Reply> {
        self.orchestrator.begin_conversation(key).await?;
        Ok(Reply::Text("Hello, what can I do for you?".to_string()))
    }

    async fn handle_end(&self, key: &str) -> Result<Reply> {
        self.orchestrator.end_conversation(key).await?;
        Ok(Reply::Text("Good bye~~".to_string()))
    }

    async fn handle_image(&self, prompt: &str) -> Result<Reply> {
        if prompt.trim().is_empty() {
            return Err(Error::Validation("Please enter a prompt".to_string()));
        }

        match self.artifact_mode {
            ArtifactMode::Full => {
                let (bytes, record) = self.pipeline.generate_and_store(prompt).await?;
                tracing::info!(id = record.id, "image generated and stored");
                Ok(Reply::Photo {
                    bytes,
                    caption: "Here is the picture I generated for you. It is saved, \
                              type /image_log to check the history."
                        .to_string(),
                })
            }
            ArtifactMode::UrlOnly => {
                let url = self
                    .pipeline
                    .generate_url_only(prompt, &self.url_log)
                    .await?;
                Ok(Reply::Text(format!(
                    "Here is the picture I generated for you:\n{url}"
                )))
            }
        }
    }

    async fn handle_image_log(&self) -> Result<Reply> {
        let mut listing = String::from("Here are the image records:\n");
        match self.artifact_mode {
            ArtifactMode::Full => {
                for (number, prompt) in self.index.list().await {
                    listing.push_str(&format!("{number}. {prompt}\n"));
                }
                listing.push_str("\n\nYou can use the /image_review command to check a record.");
            }
            ArtifactMode::UrlOnly => {
                for (number, (prompt, url)) in self.url_log.entries().await?.iter().enumerate() {
                    listing.push_str(&format!("{}. {prompt}: {url}\n", number + 1));
                }
            }
        }
        Ok(Reply::Text(listing))
    }

    fn parse_id(args: &str, action: &str) -> Result<u64> {
        let arg = args.split_whitespace().next().unwrap_or("");
        arg.parse().map_err(|_| {
            Error::Validation(format!(
                "To {action} an image record, please enter the id of it, \
                 use the /image_log command to check the id."
            ))
        })
    }

    async fn handle_image_review(&self, args: &str) -> Result<Reply> {
        if self.artifact_mode == ArtifactMode::UrlOnly {
            return Ok(Reply::Text(
                "Image records are not kept in URL-only mode, use /image_log.".to_string(),
            ));
        }
        let id = Self::parse_id(args, "review")?;

        let Some(record) = self.index.get(id).await else {
            return Ok(Reply::Text(
                "I'm sorry, I can't find this record...".to_string(),
            ));
        };
        let bytes = self.pipeline.load_blob(&record).await?;
        Ok(Reply::Photo {
            bytes,
            caption: "Here is the image you want to review.".to_string(),
        })
    }

    async fn handle_image_del(&self, args: &str) -> Result<Reply> {
        if self.artifact_mode == ArtifactMode::UrlOnly {
            return Ok(Reply::Text(
                "Image records are not kept in URL-only mode, use /image_clear.".to_string(),
            ));
        }
        let id = Self::parse_id(args, "delete")?;

        match self.index.delete(id).await {
            Ok(()) => Ok(Reply::Text(
                "Successfully deleted an image record!".to_string(),
            )),
            Err(Error::NotFound(_)) => Ok(Reply::Text(
                "I'm sorry, I can't find this record...".to_string(),
            )),
            Err(e) => Err(e),
        }
    }

    async fn handle_image_clear(&self) -> Result<Reply> {
        if self.artifact_mode != ArtifactMode::UrlOnly {
            return Ok(Reply::Text(
                "/image_clear only applies to URL-only mode, use /image_del.".to_string(),
            ));
        }
        self.url_log.clear_all().await?;
        Ok(Reply::Text("Cleared all image records.".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ByteFetcher, ImageGenerator, TextGenerator};
    use crate::config::{ChatConfig, DeadlineConfig};
    use crate::context::{ChatMessage, ContextStore};
    use crate::storage::{FsBlobStore, MemoryKv};
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct ScriptedText;

    #[async_trait]
    impl TextGenerator for ScriptedText {
        async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
            Ok(format!("echo: {}", messages.last().unwrap().content))
        }
    }

    struct FailingText;

    #[async_trait]
    impl TextGenerator for FailingText {
        async fn generate(&self, _messages: &[ChatMessage]) -> Result<String> {
            Err(Error::Backend(
                "secret credential leaked in detail".to_string(),
            ))
        }
    }

    struct ScriptedImage;

    #[async_trait]
    impl ImageGenerator for ScriptedImage {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok("https://img.example/generated".to_string())
        }
    }

    struct ScriptedFetcher;

    #[async_trait]
    impl ByteFetcher for ScriptedFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            Ok(b"jpegbytes".to_vec())
        }
    }

    async fn make_router(
        text: Arc<dyn TextGenerator>,
        mode: ArtifactMode,
    ) -> (CommandRouter, TempDir) {
        let dir = TempDir::new().unwrap();
        let chat = ChatConfig::default();
        let kv = Arc::new(MemoryKv::new());
        let contexts = Arc::new(ContextStore::new(kv.clone(), chat.system_preamble.clone()));
        let orchestrator = Arc::new(ChatOrchestrator::new(
            contexts,
            text,
            DeadlineConfig::default(),
            &chat,
        ));
        let blobs = Arc::new(FsBlobStore::new(dir.path().join("images")).await.unwrap());
        let index = Arc::new(ArtifactIndex::open(dir.path()).await.unwrap());
        let pipeline = Arc::new(ImagePipeline::new(
            Arc::new(ScriptedImage),
            Arc::new(ScriptedFetcher),
            blobs,
            index.clone(),
            DeadlineConfig::default(),
        ));
        let url_log = Arc::new(PromptUrlLog::new(kv));
        let router = CommandRouter::new(orchestrator, pipeline, index, url_log, mode);
        (router, dir)
    }

    fn text_of(reply: Reply) -> String {
        match reply {
            Reply::Text(t) => t,
            Reply::Photo { caption, .. } => panic!("expected text, got photo: {caption}"),
        }
    }

    #[tokio::test]
    async fn test_plain_text_routes_to_chat() {
        let (router, _dir) = make_router(Arc::new(ScriptedText), ArtifactMode::Full).await;
        let reply = router.dispatch("chat-1", "hello there").await;
        assert_eq!(text_of(reply), "echo: hello there");
    }

    #[tokio::test]
    async fn test_start_then_chat_then_end() {
        let (router, _dir) = make_router(Arc::new(ScriptedText), ArtifactMode::Full).await;

        let greeting = text_of(router.dispatch("chat-1", "/start").await);
        assert_eq!(greeting, "Hello, what can I do for you?");

        let reply = text_of(router.dispatch("chat-1", "hi").await);
        assert!(reply.starts_with("echo: hi"));
        assert!(reply.contains("/end"));

        let farewell = text_of(router.dispatch("chat-1", "/end").await);
        assert_eq!(farewell, "Good bye~~");
    }

    #[tokio::test]
    async fn test_backend_failure_is_masked() {
        let (router, _dir) = make_router(Arc::new(FailingText), ArtifactMode::Full).await;
        let reply = text_of(router.dispatch("chat-1", "hi").await);
        assert_eq!(reply, GENERIC_FAILURE);
        assert!(!reply.contains("credential"));
    }

    #[tokio::test]
    async fn test_image_flow_full_mode() {
        let (router, _dir) = make_router(Arc::new(ScriptedText), ArtifactMode::Full).await;

        let reply = router.dispatch("chat-1", "/image a lovely cat").await;
        let Reply::Photo { bytes, .. } = reply else {
            panic!("expected photo reply");
        };
        assert_eq!(bytes, b"jpegbytes");

        let log = text_of(router.dispatch("chat-1", "/image_log").await);
        assert!(log.contains("1. a lovely cat"));

        let review = router.dispatch("chat-1", "/image_review 1").await;
        assert!(matches!(review, Reply::Photo { .. }));

        let deleted = text_of(router.dispatch("chat-1", "/image_del 1").await);
        assert_eq!(deleted, "Successfully deleted an image record!");

        let gone = text_of(router.dispatch("chat-1", "/image_review 1").await);
        assert_eq!(gone, "I'm sorry, I can't find this record...");
    }

    #[tokio::test]
    async fn test_image_without_prompt() {
        let (router, _dir) = make_router(Arc::new(ScriptedText), ArtifactMode::Full).await;
        let reply = text_of(router.dispatch("chat-1", "/image").await);
        assert_eq!(reply, "Please enter a prompt");
    }

    #[tokio::test]
    async fn test_non_numeric_id_gets_corrective_message() {
        let (router, _dir) = make_router(Arc::new(ScriptedText), ArtifactMode::Full).await;
        let reply = text_of(router.dispatch("chat-1", "/image_review four").await);
        assert!(reply.contains("please enter the id"));

        let reply = text_of(router.dispatch("chat-1", "/image_del").await);
        assert!(reply.contains("please enter the id"));
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_handled() {
        let (router, _dir) = make_router(Arc::new(ScriptedText), ArtifactMode::Full).await;
        let reply = text_of(router.dispatch("chat-1", "/image_del 42").await);
        assert_eq!(reply, "I'm sorry, I can't find this record...");
    }

    #[tokio::test]
    async fn test_url_only_mode() {
        let (router, _dir) = make_router(Arc::new(ScriptedText), ArtifactMode::UrlOnly).await;

        let reply = text_of(router.dispatch("chat-1", "/image a cat").await);
        assert!(reply.contains("https://img.example/generated"));

        let log = text_of(router.dispatch("chat-1", "/image_log").await);
        assert!(log.contains("a cat: https://img.example/generated"));

        let cleared = text_of(router.dispatch("chat-1", "/image_clear").await);
        assert_eq!(cleared, "Cleared all image records.");

        let log = text_of(router.dispatch("chat-1", "/image_log").await);
        assert!(!log.contains("a cat"));
    }

    #[tokio::test]
    async fn test_help_and_unknown_command() {
        let (router, _dir) = make_router(Arc::new(ScriptedText), ArtifactMode::Full).await;

        let help = text_of(router.dispatch("chat-1", "/help").await);
        assert!(help.contains("/image_review"));

        let unknown = text_of(router.dispatch("chat-1", "/frobnicate").await);
        assert!(unknown.contains("/help"));
    }
}

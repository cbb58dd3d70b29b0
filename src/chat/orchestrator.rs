//! Completion orchestrator

use crate::backend::TextGenerator;
use crate::config::{ChatConfig, DeadlineConfig};
use crate::context::{ChatMessage, ContextStore};
use crate::deadline::run_with_deadline;
use crate::error::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Drives contextful and stateless reply generation.
///
/// Each conversation key owns a lock held across the whole
/// load-generate-persist sequence, so two concurrent turns on the same
/// conversation can never interleave their read-modify-write of the
/// transcript. Turns on distinct keys proceed in parallel.
pub struct ChatOrchestrator {
    contexts: Arc<ContextStore>,
    generator: Arc<dyn TextGenerator>,
    deadlines: DeadlineConfig,
    context_trailer: String,
    key_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ChatOrchestrator {
    /// Create an orchestrator over injected collaborators
    pub fn new(
        contexts: Arc<ContextStore>,
        generator: Arc<dyn TextGenerator>,
        deadlines: DeadlineConfig,
        chat: &ChatConfig,
    ) -> Self {
        Self {
            contexts,
            generator,
            deadlines,
            context_trailer: chat.context_trailer.clone(),
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().await;
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Begin a conversation with memory for `key`
    pub async fn begin_conversation(&self, key: &str) -> Result<()> {
        let lock = self.lock_for(key).await;
        let _guard = lock.lock().await;
        self.contexts.begin(key).await
    }

    /// End the conversation for `key`; idempotent
    pub async fn end_conversation(&self, key: &str) -> Result<()> {
        let lock = self.lock_for(key).await;
        let guard = lock.lock().await;
        let result = self.contexts.end(key).await;
        drop(guard);
        drop(lock);

        // An ended conversation no longer needs its lock entry; prune it so
        // the map stays bounded in a long-lived process. An entry still held
        // by an in-flight turn is left alone.
        let mut locks = self.key_locks.lock().await;
        if locks.get(key).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(key);
        }

        result
    }

    /// Generate a reply to `user_text` on conversation `key`.
    ///
    /// Contextful when a transcript exists: the user turn and the generated
    /// assistant turn are appended and the transcript persisted as a full
    /// overwrite, and a fixed trailer reminds the user that the conversation
    /// keeps memory until an explicit end command. Stateless otherwise: a
    /// single-message request, and no context is created.
    ///
    /// Empty or whitespace-only text is forwarded to the backend as-is.
    pub async fn reply(&self, key: &str, user_text: &str) -> Result<String> {
        let lock = self.lock_for(key).await;
        let _guard = lock.lock().await;

        match self.contexts.try_load(key).await? {
            Some(mut transcript) => {
                transcript.push(ChatMessage::user(user_text));
                tracing::debug!(
                    conversation = key,
                    turns = transcript.len(),
                    "contextful completion"
                );

                let result = run_with_deadline(
                    self.deadlines.long(),
                    self.generator.generate(&transcript),
                )
                .await?;

                transcript.push(ChatMessage::assistant(result.clone()));
                self.contexts.save(key, &transcript).await?;

                Ok(format!("{result}\n\n\n{}", self.context_trailer))
            }
            None => {
                tracing::debug!(conversation = key, "stateless completion");
                let messages = [ChatMessage::user(user_text)];
                run_with_deadline(self.deadlines.medium(), self.generator.generate(&messages))
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TextGenerator;
    use crate::context::Role;
    use crate::error::Error;
    use crate::storage::MemoryKv;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoGenerator {
        calls: AtomicUsize,
    }

    impl EchoGenerator {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let last = messages.last().expect("non-empty request");
            Ok(format!("echo: {}", last.content))
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _messages: &[ChatMessage]) -> Result<String> {
            Err(Error::Backend("upstream exploded".to_string()))
        }
    }

    struct StallingGenerator;

    #[async_trait]
    impl TextGenerator for StallingGenerator {
        async fn generate(&self, _messages: &[ChatMessage]) -> Result<String> {
            std::future::pending().await
        }
    }

    fn make_orchestrator(generator: Arc<dyn TextGenerator>) -> ChatOrchestrator {
        let chat = ChatConfig::default();
        let contexts = Arc::new(ContextStore::new(
            Arc::new(MemoryKv::new()),
            chat.system_preamble.clone(),
        ));
        ChatOrchestrator::new(contexts, generator, DeadlineConfig::default(), &chat)
    }

    #[tokio::test]
    async fn test_stateless_reply_creates_no_context() {
        let orchestrator = make_orchestrator(Arc::new(EchoGenerator::new()));

        let reply = orchestrator.reply("chat-1", "hi").await.unwrap();
        assert_eq!(reply, "echo: hi");

        assert!(orchestrator
            .contexts
            .try_load("chat-1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_contextful_reply_appends_turns_and_trailer() {
        let orchestrator = make_orchestrator(Arc::new(EchoGenerator::new()));
        orchestrator.begin_conversation("chat-1").await.unwrap();

        let reply = orchestrator.reply("chat-1", "hello").await.unwrap();
        assert!(reply.starts_with("echo: hello"));
        assert!(reply.contains("/end"));

        let transcript = orchestrator
            .contexts
            .try_load("chat-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[0].role, Role::System);
        assert_eq!(transcript[1], ChatMessage::user("hello"));
        assert_eq!(transcript[2], ChatMessage::assistant("echo: hello"));
    }

    #[tokio::test]
    async fn test_persisted_trailer_free() {
        // The trailer decorates the outbound reply only; the stored
        // assistant turn is the raw backend result.
        let orchestrator = make_orchestrator(Arc::new(EchoGenerator::new()));
        orchestrator.begin_conversation("chat-1").await.unwrap();
        orchestrator.reply("chat-1", "hello").await.unwrap();

        let transcript = orchestrator
            .contexts
            .try_load("chat-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(transcript[2].content, "echo: hello");
    }

    #[tokio::test]
    async fn test_end_conversation_switches_to_stateless() {
        let orchestrator = make_orchestrator(Arc::new(EchoGenerator::new()));
        orchestrator.begin_conversation("chat-1").await.unwrap();
        orchestrator.end_conversation("chat-1").await.unwrap();

        let reply = orchestrator.reply("chat-1", "hi").await.unwrap();
        assert_eq!(reply, "echo: hi");
    }

    #[tokio::test]
    async fn test_backend_error_propagates() {
        let orchestrator = make_orchestrator(Arc::new(FailingGenerator));
        let result = orchestrator.reply("chat-1", "hi").await;
        assert!(matches!(result, Err(Error::Backend(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_backend_times_out() {
        let orchestrator = make_orchestrator(Arc::new(StallingGenerator));
        let result = orchestrator.reply("chat-1", "hi").await;
        assert!(matches!(result, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn test_failed_contextful_turn_leaves_transcript_untouched() {
        let orchestrator = make_orchestrator(Arc::new(FailingGenerator));
        orchestrator.begin_conversation("chat-1").await.unwrap();

        assert!(orchestrator.reply("chat-1", "hi").await.is_err());

        let transcript = orchestrator
            .contexts
            .try_load("chat-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(transcript.len(), 1);
    }

    #[tokio::test]
    async fn test_end_conversation_prunes_lock_entry() {
        let orchestrator = make_orchestrator(Arc::new(EchoGenerator::new()));

        orchestrator.begin_conversation("chat-1").await.unwrap();
        orchestrator.reply("chat-1", "hi").await.unwrap();
        assert_eq!(orchestrator.key_locks.lock().await.len(), 1);

        orchestrator.end_conversation("chat-1").await.unwrap();
        assert!(orchestrator.key_locks.lock().await.is_empty());

        // The key is usable again after pruning
        orchestrator.begin_conversation("chat-1").await.unwrap();
        orchestrator.reply("chat-1", "again").await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_replies_serialize_per_key() {
        let orchestrator = Arc::new(make_orchestrator(Arc::new(EchoGenerator::new())));
        orchestrator.begin_conversation("chat-1").await.unwrap();

        let n = 8;
        let mut handles = Vec::new();
        for i in 0..n {
            let orchestrator = orchestrator.clone();
            handles.push(tokio::spawn(async move {
                orchestrator.reply("chat-1", &format!("turn {i}")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let transcript = orchestrator
            .contexts
            .try_load("chat-1")
            .await
            .unwrap()
            .unwrap();
        // One preamble plus one user+assistant pair per reply, no lost updates.
        assert_eq!(transcript.len(), 2 * n + 1);
        for pair in transcript[1..].chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
            assert_eq!(pair[1].content, format!("echo: {}", pair[0].content));
        }
    }
}

//! Musebot - Command-driven AI assistant with conversational memory
//!
//! Musebot relays user text to a remote text-generation backend, optionally
//! keeping multi-turn memory per conversation, and turns image prompts into
//! durably stored, reviewable artifacts.
//!
//! ## Architecture
//!
//! ```text
//! inbound text ──► CommandRouter ──┬──► ChatOrchestrator ──► ContextStore
//! (transport)                      │         │                 (KvStore)
//!                                  │         └── deadline ──► TextGenerator
//!                                  │
//!                                  └──► ImagePipeline ── deadline ──► ImageGenerator
//!                                            │                            │
//!                                            │◄── ByteFetcher ◄── url ────┘
//!                                            ├──► BlobStore   (write blob first)
//!                                            └──► ArtifactIndex (then index)
//! ```
//!
//! Every remote call runs under an explicit deadline; conversations are
//! serialized per key so concurrent turns never lose an update; and the blob
//! write always precedes the metadata insert, so the index never references
//! bytes that were not stored.
//!
//! ## Modules
//!
//! - [`handlers`]: command surface consumed by the transport layer
//! - [`chat`]: contextful/stateless reply orchestration
//! - [`images`]: image generation pipeline, artifact index, URL log
//! - [`context`]: per-conversation transcript storage
//! - [`backend`]: generation backend clients behind trait seams
//! - [`storage`]: key-value and blob store collaborators
//! - [`deadline`]: bounded-time execution for external calls
//! - [`config`]: configuration management

pub mod backend;
pub mod chat;
pub mod config;
pub mod context;
pub mod deadline;
pub mod error;
pub mod handlers;
pub mod images;
pub mod storage;

pub use config::MusebotConfig;
pub use error::{Error, Result};

//! Durable storage collaborators
//!
//! Narrow trait contracts over the key-value store (conversation transcripts,
//! prompt→URL log) and the blob store (image binaries). Concrete backends are
//! injected at construction time so components can be tested against
//! in-memory or temp-dir implementations.

mod blob;
mod kv;

pub use blob::{BlobStore, FsBlobStore};
pub use kv::{KvStore, MemoryKv};

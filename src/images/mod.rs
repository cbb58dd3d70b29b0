//! Image generation and artifact persistence
//!
//! The pipeline turns a prompt into a durably stored image: generate a URL at
//! the backend, fetch the bytes, write the blob, then index the metadata.
//! The index is the query surface for listing, reviewing, and deleting past
//! generations. A lightweight variant records only the prompt → URL mapping.

mod index;
mod pipeline;
mod types;
mod url_log;

pub use index::ArtifactIndex;
pub use pipeline::ImagePipeline;
pub use types::{storage_ref, ImageArtifact};
pub use url_log::PromptUrlLog;

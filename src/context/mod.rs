//! Per-conversation transcript storage
//!
//! A conversation key addresses at most one transcript: the ordered list of
//! role-tagged messages sent verbatim to the text-generation backend on every
//! contextful turn. Absence of a transcript is meaningful — it is how the
//! orchestrator distinguishes stateless mode from contextful mode.

mod store;
mod types;

pub use store::ContextStore;
pub use types::{ChatMessage, Role};

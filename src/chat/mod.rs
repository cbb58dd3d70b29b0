//! Conversation orchestration
//!
//! Decides per inbound message whether to run contextful (stored transcript)
//! or stateless (single message, no memory), and drives the context store and
//! the text backend under an explicit deadline.

mod orchestrator;

pub use orchestrator::ChatOrchestrator;

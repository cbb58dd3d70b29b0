//! Command surface exposed to the transport layer
//!
//! The transport (messaging adapter, stdin loop, test harness) hands each
//! inbound message to `CommandRouter::dispatch` with its conversation key and
//! gets back a text or text-plus-binary reply. Everything user-visible —
//! command parsing, argument validation messages, and the masking of internal
//! failures behind one generic retry message — lives here.

mod router;

pub use router::{CommandRouter, Reply};

//! Bounded-time execution for external calls
//!
//! Every remote call the assistant makes (chat completion, image generation,
//! blob fetch) runs under an explicit deadline. The race is a first-class
//! combinator rather than decorator-style interception, so budgets are
//! visible at the call site and testable with a mock future.

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;

/// Run `work` with an upper time bound.
///
/// If `work` completes first, its result or error is forwarded unchanged.
/// If the deadline elapses first, `Error::Timeout` is returned and the
/// in-flight future is dropped. Cancellation is best-effort only: the remote
/// backend may still complete the request server-side, and its result is
/// discarded.
pub async fn run_with_deadline<T, F>(deadline: Duration, work: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(deadline, work).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(deadline_ms = deadline.as_millis() as u64, "external call exceeded its deadline");
            Err(Error::Timeout)
        }
    }
}

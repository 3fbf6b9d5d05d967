//! Error types for the text-generation layer.
//!
//! The generation client retries internally; once retries are exhausted,
//! every transport-level failure collapses into the single
//! [`GenerationUnavailable`] condition. Callers apply their documented
//! fallback instead of inspecting transport details.

/// The text-generation service failed after exhausting its retries.
///
/// This is the only failure the rest of the system sees from the LLM:
/// rate limiting, network errors, and server errors are all absorbed by
/// the retry loop and surface here with a human-readable reason.
#[derive(Debug, thiserror::Error)]
#[error("text generation unavailable: {reason}")]
pub struct GenerationUnavailable {
    /// Description of the last underlying failure, for logs only.
    pub reason: String,
}

impl GenerationUnavailable {
    /// Wrap a failure description.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

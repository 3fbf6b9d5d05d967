//! Memory summarization calls.
//!
//! Consolidation hands the summarizer the ordered texts of the items
//! being evicted; the summarizer numbers them, renders the summarize
//! prompts, and asks the generator for a condensed recollection. The
//! fallback policy on failure belongs to the memory store, so errors
//! propagate here.

use std::fmt::Write as _;
use std::sync::Arc;

use crate::client::TextGenerator;
use crate::error::GenerationUnavailable;
use crate::prompt::PromptSet;

/// Sampling temperature for summarization calls. Lower than decisions:
/// summaries should be conservative.
const SUMMARY_TEMPERATURE: f32 = 0.3;

/// Condenses runs of episodic memory into one summary text.
pub struct Summarizer {
    generator: Arc<TextGenerator>,
    prompts: Arc<PromptSet>,
}

impl Summarizer {
    /// Create a summarizer over a shared generator and template set.
    pub const fn new(generator: Arc<TextGenerator>, prompts: Arc<PromptSet>) -> Self {
        Self { generator, prompts }
    }

    /// Summarize an ordered list of memory texts.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationUnavailable`] if the prompts cannot be
    /// rendered or the generator fails after its retries. The caller
    /// applies the placeholder-summary fallback.
    pub async fn summarize(&self, texts: &[String]) -> Result<String, GenerationUnavailable> {
        let mut events = String::new();
        for (index, text) in texts.iter().enumerate() {
            let _ = writeln!(events, "{}. {text}", index.saturating_add(1));
        }

        let system = self
            .prompts
            .summarize_system()
            .map_err(|e| GenerationUnavailable::new(e.to_string()))?;
        let user = self
            .prompts
            .summarize_user(&events)
            .map_err(|e| GenerationUnavailable::new(e.to_string()))?;

        self.generator
            .generate(&user, Some(&system), SUMMARY_TEMPERATURE)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::client::ScriptedGenerator;

    #[tokio::test]
    async fn summarize_returns_generator_output() {
        let summarizer = Summarizer::new(
            Arc::new(TextGenerator::scripted(ScriptedGenerator::always(
                "Alice and Bob talked all week.",
            ))),
            Arc::new(PromptSet::new().unwrap()),
        );
        let summary = summarizer
            .summarize(&["Alice greeted Bob".to_owned(), "Bob replied".to_owned()])
            .await
            .unwrap();
        assert_eq!(summary, "Alice and Bob talked all week.");
    }

    #[tokio::test]
    async fn summarize_propagates_generation_failure() {
        let summarizer = Summarizer::new(
            Arc::new(TextGenerator::scripted(ScriptedGenerator::failing())),
            Arc::new(PromptSet::new().unwrap()),
        );
        assert!(summarizer.summarize(&["one".to_owned()]).await.is_err());
    }
}

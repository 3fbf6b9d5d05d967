//! Decision planner: turns an agent's state snapshot into an [`Action`].
//!
//! The planner renders the prompts, calls the generator, and parses the
//! response. It is deliberately infallible from the caller's point of
//! view: a generation failure or an unparsable response produces the
//! deterministic default action instead of an error. The fallback is
//! structurally indistinguishable from a model-produced action; it is
//! only visible in logs.

use std::sync::Arc;

use tracing::warn;

use terrarium_types::{Action, MoodLabel, NOBODY};

use crate::client::TextGenerator;
use crate::parse;
use crate::prompt::PromptSet;

/// Sampling temperature for decision calls.
const DECISION_TEMPERATURE: f32 = 0.7;

/// Per-agent decision planner.
///
/// Holds the agent's immutable identity (name, personality) and shared
/// handles to the generator and template set.
pub struct Planner {
    agent_name: String,
    personality: String,
    generator: Arc<TextGenerator>,
    prompts: Arc<PromptSet>,
}

impl Planner {
    /// Create a planner for one agent.
    pub fn new(
        agent_name: impl Into<String>,
        personality: impl Into<String>,
        generator: Arc<TextGenerator>,
        prompts: Arc<PromptSet>,
    ) -> Self {
        Self {
            agent_name: agent_name.into(),
            personality: personality.into(),
            generator,
            prompts,
        }
    }

    /// Decide the next action from a state snapshot.
    ///
    /// Never fails: any upstream problem (template render, generation,
    /// parsing, missing fields) collapses into the default action --
    /// a message to the first peer (or the "nobody" sentinel) with a
    /// templated line naming the agent and mood.
    pub async fn decide(
        &self,
        mood: MoodLabel,
        recent_memories: &[String],
        peer_names: &[String],
        relations_summary: &str,
    ) -> Action {
        let recent_text = if recent_memories.is_empty() {
            String::from("no recent events")
        } else {
            recent_memories.join(" ")
        };
        let peers_text = peer_names.join(", ");

        let system = match self
            .prompts
            .agent_system(&self.agent_name, &self.personality, mood)
        {
            Ok(s) => s,
            Err(e) => {
                warn!(agent = self.agent_name, error = %e, "system prompt render failed");
                return self.fallback(mood, peer_names, relations_summary);
            }
        };
        let user = match self
            .prompts
            .agent_action(&recent_text, relations_summary, &peers_text)
        {
            Ok(u) => u,
            Err(e) => {
                warn!(agent = self.agent_name, error = %e, "action prompt render failed");
                return self.fallback(mood, peer_names, relations_summary);
            }
        };

        let response = match self
            .generator
            .generate(&user, Some(&system), DECISION_TEMPERATURE)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(agent = self.agent_name, error = %e, "generation failed, using fallback action");
                return self.fallback(mood, peer_names, relations_summary);
            }
        };

        match parse::extract_action(&response) {
            Ok(action) => action,
            Err(e) => {
                warn!(
                    agent = self.agent_name,
                    error = %e,
                    raw_response = response,
                    "unparsable response, using fallback action"
                );
                self.fallback(mood, peer_names, relations_summary)
            }
        }
    }

    /// The deterministic default action.
    fn fallback(&self, mood: MoodLabel, peer_names: &[String], relations_summary: &str) -> Action {
        let target = peer_names
            .first()
            .cloned()
            .unwrap_or_else(|| NOBODY.to_owned());
        Action::Message {
            target,
            content: format!(
                "Hi, I'm {}. I'm in a {} mood. Relations: {}",
                self.agent_name, mood, relations_summary
            ),
        }
    }
}

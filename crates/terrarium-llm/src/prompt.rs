//! Prompt templates for agent decisions and memory summarization.
//!
//! Templates are embedded at compile time and rendered with `minijinja`.
//! Rendering can fail only on template bugs, so callers treat a render
//! error the same way they treat a generation failure: apply the
//! documented fallback.

use minijinja::{Environment, context};

use terrarium_types::MoodLabel;

/// A rendering failure from a prompt template.
#[derive(Debug, thiserror::Error)]
#[error("template render error: {0}")]
pub struct PromptError(#[from] minijinja::Error);

/// The compiled prompt template set.
///
/// Built once at startup and shared across all agents.
pub struct PromptSet {
    env: Environment<'static>,
}

impl PromptSet {
    /// Compile the embedded templates.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError`] if an embedded template fails to compile;
    /// this indicates a packaging bug, not a runtime condition.
    pub fn new() -> Result<Self, PromptError> {
        let mut env = Environment::new();
        env.add_template("agent_system", include_str!("../templates/agent_system.j2"))?;
        env.add_template("agent_action", include_str!("../templates/agent_action.j2"))?;
        env.add_template(
            "summarize_system",
            include_str!("../templates/summarize_system.j2"),
        )?;
        env.add_template(
            "summarize_user",
            include_str!("../templates/summarize_user.j2"),
        )?;
        Ok(Self { env })
    }

    /// Render the per-agent system prompt.
    pub fn agent_system(
        &self,
        name: &str,
        personality: &str,
        mood: MoodLabel,
    ) -> Result<String, PromptError> {
        let rendered = self.env.get_template("agent_system")?.render(context! {
            name => name,
            personality => personality,
            mood => mood.as_str(),
        })?;
        Ok(rendered)
    }

    /// Render the per-turn action prompt.
    pub fn agent_action(
        &self,
        recent_memories: &str,
        relations: &str,
        peers: &str,
    ) -> Result<String, PromptError> {
        let rendered = self.env.get_template("agent_action")?.render(context! {
            recent_memories => recent_memories,
            relations => relations,
            peers => peers,
        })?;
        Ok(rendered)
    }

    /// Render the summarization system prompt.
    pub fn summarize_system(&self) -> Result<String, PromptError> {
        let rendered = self.env.get_template("summarize_system")?.render(context! {})?;
        Ok(rendered)
    }

    /// Render the summarization user prompt for a numbered event list.
    pub fn summarize_user(&self, events: &str) -> Result<String, PromptError> {
        let rendered = self.env.get_template("summarize_user")?.render(context! {
            events => events,
        })?;
        Ok(rendered)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn templates_compile() {
        assert!(PromptSet::new().is_ok());
    }

    #[test]
    fn system_prompt_mentions_name_and_mood() {
        let prompts = PromptSet::new().unwrap();
        let rendered = prompts
            .agent_system("Alice", "curious and talkative", MoodLabel::Good)
            .unwrap();
        assert!(rendered.contains("Alice"));
        assert!(rendered.contains("good"));
        assert!(rendered.contains("curious and talkative"));
    }

    #[test]
    fn action_prompt_includes_context() {
        let prompts = PromptSet::new().unwrap();
        let rendered = prompts
            .agent_action("saw a bird", "Bob: 10", "Bob, Carol")
            .unwrap();
        assert!(rendered.contains("saw a bird"));
        assert!(rendered.contains("Bob: 10"));
        assert!(rendered.contains("Bob, Carol"));
    }
}

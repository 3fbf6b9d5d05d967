//! The agent runtime: one addressable simulated entity.
//!
//! Composes the emotion state, relationship table, episodic memory, and
//! decision planner behind two operations:
//!
//! - [`AgentRuntime::perceive`] folds a world event into the agent's
//!   local state (memory, mood, and -- when attributed to a peer --
//!   affinity). The three mutations are independent and non-failing.
//! - [`AgentRuntime::act`] snapshots the agent's state, delegates to the
//!   planner, records the resulting intent, and returns the action.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use terrarium_types::{Action, AgentId, AgentSeed, MoodLabel};

use crate::emotion::EmotionState;
use crate::memory::MemoryStore;
use crate::relationship::RelationshipTable;
use terrarium_llm::Planner;

/// How many recent memories go into each decision snapshot.
const RECALL_COUNT: usize = 7;

/// Maximum length of the recorded current intent, in characters.
const INTENT_MAX_CHARS: usize = 50;

/// One live agent.
pub struct AgentRuntime {
    id: AgentId,
    name: String,
    personality: String,
    emotions: EmotionState,
    relationships: RelationshipTable,
    memory: MemoryStore,
    planner: Planner,
    current_intent: String,
}

impl AgentRuntime {
    /// Assemble a runtime from a stored seed row and its collaborators.
    pub fn new(seed: AgentSeed, memory: MemoryStore, planner: Planner) -> Self {
        Self {
            id: seed.id,
            name: seed.name,
            personality: seed.personality,
            emotions: EmotionState::new(seed.mood_value),
            relationships: RelationshipTable::new(),
            memory,
            planner,
            current_intent: String::new(),
        }
    }

    /// The agent's identity.
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Immutable personality descriptor.
    pub fn personality(&self) -> &str {
        &self.personality
    }

    /// Current raw mood value.
    pub const fn mood_value(&self) -> i32 {
        self.emotions.value()
    }

    /// Current derived mood label.
    pub const fn mood_label(&self) -> MoodLabel {
        self.emotions.label()
    }

    /// Current affinity toward `peer` (0 when unknown).
    pub fn affinity(&self, peer: AgentId) -> i32 {
        self.relationships.affinity(peer)
    }

    /// Snapshot copy of all materialized affinities.
    pub fn affinities(&self) -> BTreeMap<AgentId, i32> {
        self.relationships.all()
    }

    /// The agent's memory store.
    pub const fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// The last recorded intent summary (may be empty before first act).
    pub fn current_intent(&self) -> &str {
        &self.current_intent
    }

    /// Perceive a world event.
    ///
    /// Appends to memory, applies `delta` to mood, and -- only when the
    /// event is attributed to a peer -- applies `delta` to the affinity
    /// toward that peer. Mutations are independent; none can fail
    /// (generation failures inside memory consolidation are absorbed by
    /// the store).
    pub fn perceive(&mut self, event_text: &str, delta: i32, peer: Option<AgentId>) {
        self.memory.add(event_text);
        self.emotions.update(delta);
        if let Some(peer_id) = peer {
            self.relationships.update(peer_id, delta);
        }
    }

    /// Decide this turn's action.
    ///
    /// Snapshots the most recent memories, the mood label, and the
    /// affinity toward each named peer (peers missing from
    /// `peer_id_by_name` read as affinity 0 rather than erroring),
    /// then delegates to the planner. The returned action is also
    /// recorded as a truncated human-readable current intent.
    pub async fn act(
        &mut self,
        peer_names: &[String],
        peer_id_by_name: &BTreeMap<String, AgentId>,
    ) -> Action {
        let recent = self.memory.recent(RECALL_COUNT);
        let mood = self.emotions.label();

        let mut relations_summary = String::new();
        for name in peer_names {
            let affinity = peer_id_by_name
                .get(name)
                .map_or(0, |id| self.relationships.affinity(*id));
            if !relations_summary.is_empty() {
                relations_summary.push_str(", ");
            }
            let _ = write!(relations_summary, "{name}: {affinity}");
        }

        let action = self
            .planner
            .decide(mood, &recent, peer_names, &relations_summary)
            .await;

        self.current_intent = action.intent_summary(INTENT_MAX_CHARS);
        action
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::unreachable)]
mod tests {
    use std::sync::Arc;

    use terrarium_llm::{PromptSet, ScriptedGenerator, Summarizer, TextGenerator};
    use terrarium_types::MoodLabel;

    use super::*;
    use crate::memory::MemoryConfig;

    fn make_agent(name: &str, mood: i32, generator: ScriptedGenerator) -> AgentRuntime {
        let generator = Arc::new(TextGenerator::scripted(generator));
        let prompts = Arc::new(PromptSet::new().unwrap());
        let memory = MemoryStore::new(
            MemoryConfig::default(),
            Summarizer::new(Arc::clone(&generator), Arc::clone(&prompts)),
        );
        let planner = Planner::new(name, "test personality", generator, prompts);
        let seed = AgentSeed {
            id: AgentId::new(),
            name: name.to_owned(),
            personality: "test personality".to_owned(),
            mood_value: mood,
        };
        AgentRuntime::new(seed, memory, planner)
    }

    #[tokio::test]
    async fn perceive_updates_memory_mood_and_affinity() {
        let mut agent = make_agent("Ada", 0, ScriptedGenerator::failing());
        let peer = AgentId::new();

        agent.perceive("gift received", 20, Some(peer));
        assert_eq!(agent.mood_value(), 20);
        assert_eq!(agent.mood_label(), MoodLabel::Good);
        assert_eq!(agent.affinity(peer), 20);
        assert_eq!(agent.memory().recent(1), vec!["gift received"]);

        agent.perceive("terrible storm", -90, None);
        assert_eq!(agent.mood_value(), -100);
        assert_eq!(agent.mood_label(), MoodLabel::Terrible);
        // No peer attribution: affinity unchanged.
        assert_eq!(agent.affinity(peer), 20);
    }

    #[tokio::test]
    async fn act_records_truncated_intent() {
        let long_line = "x".repeat(120);
        let response = format!(
            r#"{{"type": "message", "target": "Bea", "content": "{long_line}"}}"#
        );
        let mut agent = make_agent("Ada", 0, ScriptedGenerator::always(response));

        let names = vec!["Bea".to_owned()];
        let mut ids = BTreeMap::new();
        ids.insert("Bea".to_owned(), AgentId::new());

        let action = agent.act(&names, &ids).await;
        assert!(matches!(action, Action::Message { .. }));
        assert_eq!(agent.current_intent().chars().count(), 50);
    }

    #[tokio::test]
    async fn act_with_unmapped_peer_defaults_affinity_to_zero() {
        // The peer map is empty; act must not fail and the fallback
        // (failing generator) must target the first peer.
        let mut agent = make_agent("Ada", 0, ScriptedGenerator::failing());
        let names = vec!["Ghost".to_owned()];
        let action = agent.act(&names, &BTreeMap::new()).await;
        let Action::Message { target, content } = action else {
            unreachable!("fallback is always a message");
        };
        assert_eq!(target, "Ghost");
        assert!(content.contains("Ghost: 0"));
    }

    #[tokio::test]
    async fn reflect_sets_thinking_intent() {
        let mut agent = make_agent(
            "Ada",
            0,
            ScriptedGenerator::always(r#"{"type": "reflect"}"#),
        );
        let action = agent.act(&[], &BTreeMap::new()).await;
        assert_eq!(action, Action::Reflect);
        assert_eq!(agent.current_intent(), "Reflecting...");
    }
}

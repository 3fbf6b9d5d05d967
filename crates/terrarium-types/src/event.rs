//! Immutable world event records and agent seed data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::AgentId;
use crate::mood::{PersistedMood, RelationKind};

/// An immutable log record describing something that happened in the world.
///
/// Created by the scheduler as a side effect of routing an action (or by
/// an external injection); never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EventRecord {
    /// Human-readable description of the event.
    pub content: String,
    /// The agent that caused the event, if any.
    pub actor: Option<AgentId>,
    /// The agent the event was directed at, if any.
    pub target: Option<AgentId>,
    /// The actor's persisted mood after the event, if relevant.
    pub mood_after: Option<PersistedMood>,
    /// Relationship kind recorded with the event, if any.
    pub relation_kind: Option<RelationKind>,
    /// Affinity change applied as part of the event.
    pub relation_delta: i32,
    /// When the event was created.
    pub created_at: DateTime<Utc>,
}

impl EventRecord {
    /// Create a plain event with content only.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            actor: None,
            target: None,
            mood_after: None,
            relation_kind: None,
            relation_delta: 0,
            created_at: Utc::now(),
        }
    }

    /// Attach an actor.
    #[must_use]
    pub const fn with_actor(mut self, actor: AgentId) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Attach a target.
    #[must_use]
    pub const fn with_target(mut self, target: AgentId) -> Self {
        self.target = Some(target);
        self
    }

    /// Attach a relationship annotation.
    #[must_use]
    pub const fn with_relation(mut self, kind: RelationKind, delta: i32) -> Self {
        self.relation_kind = Some(kind);
        self.relation_delta = delta;
        self
    }

    /// Record the actor's mood after the event.
    #[must_use]
    pub const fn with_mood(mut self, mood: PersistedMood) -> Self {
        self.mood_after = Some(mood);
        self
    }
}

/// A stored agent row as loaded from persistence at simulation start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentSeed {
    /// The agent's identity.
    pub id: AgentId,
    /// Display name, unique within a simulation.
    pub name: String,
    /// Free-text personality descriptor, immutable after creation.
    pub personality: String,
    /// Mood value at load time.
    pub mood_value: i32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn builder_attaches_fields() {
        let actor = AgentId::new();
        let target = AgentId::new();
        let event = EventRecord::new("Alice → Bob: hi")
            .with_actor(actor)
            .with_target(target)
            .with_relation(RelationKind::Respect, 3)
            .with_mood(PersistedMood::Happy);
        assert_eq!(event.actor, Some(actor));
        assert_eq!(event.target, Some(target));
        assert_eq!(event.relation_kind, Some(RelationKind::Respect));
        assert_eq!(event.relation_delta, 3);
        assert_eq!(event.mood_after, Some(PersistedMood::Happy));
    }
}

//! The persistence collaborator interface.
//!
//! The core treats storage as an opaque get/upsert store behind the
//! [`Persistence`] trait; [`HistoryReader`] is the matching read seam
//! the observer serves history from. The production implementation
//! lives in `terrarium-db`; the [`MemoryPersistence`] stub here backs
//! tests and database-less local runs.
//!
//! Failure policy: a persistence failure
//! is fatal only during the initial load. Once the world is running, a
//! failed sync is logged and skipped for that agent that tick; state
//! stays correct in memory and converges on the next successful sync.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use terrarium_types::{
    AgentId, AgentSeed, EventId, EventRecord, PersistedMood, RelationKind, RelationshipView,
    StoredEvent, mood_adjusted_strength,
};

/// A storage operation failed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("persistence unavailable: {reason}")]
pub struct PersistenceError {
    /// Description of the underlying failure.
    pub reason: String,
}

impl PersistenceError {
    /// Wrap a failure description.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// The opaque store the scheduler syncs agent state through.
///
/// All methods return `Send` futures so the scheduler can run inside a
/// spawned task regardless of the implementation.
pub trait Persistence: Send + Sync {
    /// Load every stored agent row.
    fn load_all_agents(
        &self,
    ) -> impl Future<Output = Result<Vec<AgentSeed>, PersistenceError>> + Send;

    /// Write an agent's current mood label and value.
    fn save_mood(
        &self,
        id: AgentId,
        mood: PersistedMood,
        mood_value: i32,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    /// Append an immutable event record, returning its assigned id.
    fn append_event(
        &self,
        event: &EventRecord,
    ) -> impl Future<Output = Result<EventId, PersistenceError>> + Send;

    /// Append a delivered agent-to-agent message.
    fn append_message(
        &self,
        from: AgentId,
        to: AgentId,
        content: &str,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    /// Create or update a directed relationship record.
    fn upsert_relationship(
        &self,
        from: AgentId,
        to: AgentId,
        kind: RelationKind,
        delta: i32,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

/// Read access to persisted history for the observer's dashboard
/// endpoints.
///
/// Separate from [`Persistence`] because the scheduler only ever
/// writes; the observer is the only reader.
pub trait HistoryReader: Send + Sync {
    /// The `limit` most recent events, newest first, with participant
    /// names resolved.
    fn recent_events(
        &self,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<StoredEvent>, PersistenceError>> + Send;

    /// Every stored relationship with its mood-adjusted display
    /// strength.
    fn relationships(
        &self,
    ) -> impl Future<Output = Result<Vec<RelationshipView>, PersistenceError>> + Send;
}

/// In-memory persistence used by tests and storeless local runs.
///
/// Clones share the same underlying state. The `fail_writes` switch
/// makes every write operation fail, for exercising the log-and-skip
/// sync policy.
#[derive(Clone, Default)]
pub struct MemoryPersistence {
    seeds: Arc<Mutex<Vec<AgentSeed>>>,
    events: Arc<Mutex<Vec<(EventId, EventRecord)>>>,
    messages: Arc<Mutex<Vec<(AgentId, AgentId, String)>>>,
    moods: Arc<Mutex<BTreeMap<AgentId, (PersistedMood, i32)>>>,
    relationships: Arc<Mutex<BTreeMap<(AgentId, AgentId), (RelationKind, i32)>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryPersistence {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-seeded with agent rows.
    pub fn with_seeds(seeds: Vec<AgentSeed>) -> Self {
        let store = Self::default();
        {
            let mut guard = store.seeds.lock().unwrap_or_else(PoisonError::into_inner);
            *guard = seeds;
        }
        store
    }

    /// Make all subsequent write operations fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Release);
    }

    /// Contents of all recorded events, in append order.
    pub fn event_contents(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, e)| e.content.clone())
            .collect()
    }

    /// All recorded events, in append order.
    pub fn events(&self) -> Vec<EventRecord> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, e)| e.clone())
            .collect()
    }

    fn name_of(&self, id: AgentId) -> Option<String> {
        self.seeds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.name.clone())
    }

    /// All delivered messages, in append order.
    pub fn messages(&self) -> Vec<(AgentId, AgentId, String)> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The last synced mood for an agent, if any.
    pub fn mood_of(&self, id: AgentId) -> Option<(PersistedMood, i32)> {
        self.moods
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .copied()
    }

    /// The stored relationship record for a directed pair, if any.
    pub fn relationship_of(&self, from: AgentId, to: AgentId) -> Option<(RelationKind, i32)> {
        self.relationships
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(from, to))
            .copied()
    }

    fn check_writable(&self) -> Result<(), PersistenceError> {
        if self.fail_writes.load(Ordering::Acquire) {
            return Err(PersistenceError::new("write failure injected"));
        }
        Ok(())
    }
}

impl Persistence for MemoryPersistence {
    async fn load_all_agents(&self) -> Result<Vec<AgentSeed>, PersistenceError> {
        Ok(self
            .seeds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn save_mood(
        &self,
        id: AgentId,
        mood: PersistedMood,
        mood_value: i32,
    ) -> Result<(), PersistenceError> {
        self.check_writable()?;
        let mut moods = self.moods.lock().unwrap_or_else(PoisonError::into_inner);
        moods.insert(id, (mood, mood_value));
        Ok(())
    }

    async fn append_event(&self, event: &EventRecord) -> Result<EventId, PersistenceError> {
        self.check_writable()?;
        let id = EventId::new();
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        events.push((id, event.clone()));
        Ok(id)
    }

    async fn append_message(
        &self,
        from: AgentId,
        to: AgentId,
        content: &str,
    ) -> Result<(), PersistenceError> {
        self.check_writable()?;
        let mut messages = self
            .messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        messages.push((from, to, content.to_owned()));
        Ok(())
    }

    async fn upsert_relationship(
        &self,
        from: AgentId,
        to: AgentId,
        kind: RelationKind,
        delta: i32,
    ) -> Result<(), PersistenceError> {
        self.check_writable()?;
        let mut relationships = self
            .relationships
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        relationships
            .entry((from, to))
            .and_modify(|(stored_kind, strength)| {
                *stored_kind = kind;
                *strength = strength.saturating_add(delta);
            })
            .or_insert((kind, delta));
        Ok(())
    }
}

impl HistoryReader for MemoryPersistence {
    async fn recent_events(&self, limit: u32) -> Result<Vec<StoredEvent>, PersistenceError> {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(events
            .iter()
            .rev()
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .map(|(id, event)| StoredEvent {
                id: *id,
                content: event.content.clone(),
                actor_name: event.actor.and_then(|a| self.name_of(a)),
                target_name: event.target.and_then(|t| self.name_of(t)),
                mood_after: event.mood_after,
                relation_kind: event.relation_kind,
                relation_delta: event.relation_delta,
                created_at: event.created_at,
            })
            .collect())
    }

    async fn relationships(&self) -> Result<Vec<RelationshipView>, PersistenceError> {
        let relationships = self
            .relationships
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let moods = self.moods.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(relationships
            .iter()
            .map(|(&(from, to), &(kind, strength))| {
                let mood = |id: AgentId| moods.get(&id).map(|(mood, _)| *mood);
                RelationshipView {
                    from_id: from,
                    to_id: to,
                    from_name: self.name_of(from),
                    to_name: self.name_of(to),
                    kind,
                    strength,
                    display_strength: mood_adjusted_strength(
                        strength,
                        mood(from),
                        mood(to),
                        kind,
                    ),
                }
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trips() {
        let seed = AgentSeed {
            id: AgentId::new(),
            name: "Ada".to_owned(),
            personality: "curious".to_owned(),
            mood_value: 5,
        };
        let store = MemoryPersistence::with_seeds(vec![seed.clone()]);

        assert_eq!(store.load_all_agents().await.unwrap(), vec![seed.clone()]);

        store
            .save_mood(seed.id, PersistedMood::Happy, 30)
            .await
            .unwrap();
        assert_eq!(store.mood_of(seed.id), Some((PersistedMood::Happy, 30)));

        store
            .append_event(&EventRecord::new("something"))
            .await
            .unwrap();
        assert_eq!(store.event_contents(), vec!["something"]);
    }

    #[tokio::test]
    async fn injected_failures_surface_on_writes_only() {
        let store = MemoryPersistence::new();
        store.fail_writes(true);
        assert!(store.load_all_agents().await.is_ok());
        assert!(
            store
                .save_mood(AgentId::new(), PersistedMood::Neutral, 0)
                .await
                .is_err()
        );
        assert!(store.append_event(&EventRecord::new("x")).await.is_err());
    }

    #[tokio::test]
    async fn recent_events_are_newest_first_with_resolved_names() {
        let alice = AgentSeed {
            id: AgentId::new(),
            name: "Alice".to_owned(),
            personality: "curious".to_owned(),
            mood_value: 0,
        };
        let store = MemoryPersistence::with_seeds(vec![alice.clone()]);
        store
            .append_event(&EventRecord::new("first").with_actor(alice.id))
            .await
            .unwrap();
        store
            .append_event(&EventRecord::new("second").with_actor(alice.id))
            .await
            .unwrap();

        let events = store.recent_events(1).await.unwrap();
        assert_eq!(events.len(), 1);
        let newest = events.first().unwrap();
        assert_eq!(newest.content, "second");
        assert_eq!(newest.actor_name.as_deref(), Some("Alice"));
        assert!(newest.target_name.is_none());
    }

    #[tokio::test]
    async fn relationship_views_carry_mood_adjusted_strength() {
        let a = AgentId::new();
        let b = AgentId::new();
        let store = MemoryPersistence::new();
        store
            .upsert_relationship(a, b, RelationKind::Respect, 40)
            .await
            .unwrap();
        store.save_mood(a, PersistedMood::Happy, 30).await.unwrap();
        store.save_mood(b, PersistedMood::Happy, 30).await.unwrap();

        let views = store.relationships().await.unwrap();
        assert_eq!(views.len(), 1);
        let view = views.first().unwrap();
        assert_eq!(view.kind, RelationKind::Respect);
        assert_eq!(view.strength, 40);
        assert_eq!(view.display_strength, 50);
    }

    #[tokio::test]
    async fn relationship_upsert_accumulates() {
        let store = MemoryPersistence::new();
        let a = AgentId::new();
        let b = AgentId::new();
        store
            .upsert_relationship(a, b, RelationKind::Neutral, 3)
            .await
            .unwrap();
        store
            .upsert_relationship(a, b, RelationKind::Respect, 3)
            .await
            .unwrap();
        assert_eq!(store.relationship_of(a, b), Some((RelationKind::Respect, 6)));
        assert_eq!(store.relationship_of(b, a), None);
    }
}

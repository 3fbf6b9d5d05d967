//! The world scheduler: the per-tick simulation driver.
//!
//! One tick visits every loaded agent in ascending id order and runs a
//! full turn for each: decide, route, persist, broadcast. Turns within
//! a tick are strictly sequential; an agent acting later in a tick sees
//! the in-memory effects of every earlier turn.
//!
//! Failure isolation: one agent's turn failing (generation, parse, or
//! storage) is logged and skipped; it never aborts the tick or touches
//! other agents. Persistence failures after load are non-fatal -- the
//! in-memory state stays authoritative and re-syncs on the next
//! successful write.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use terrarium_agents::{AgentRuntime, MemoryConfig, MemoryStore};
use terrarium_llm::{Planner, PromptError, PromptSet, Summarizer, TextGenerator};
use terrarium_types::{
    Action, AgentId, BroadcastPayload, EventRecord, MoodUpdate, PersistedMood, RelationKind,
};

use crate::control::ControlState;
use crate::fanout::Fanout;
use crate::handle::WorldHandle;
use crate::persistence::{Persistence, PersistenceError};

/// Mood and affinity delta applied to a message's recipient.
const MESSAGE_DELTA: i32 = 3;

/// Errors that prevent a world from starting.
///
/// Everything after a successful [`Scheduler::load`] is handled inside
/// the loop and never surfaces as an error.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The initial agent load failed.
    #[error("failed to load agents: {source}")]
    Load {
        /// The underlying persistence failure.
        #[from]
        source: PersistenceError,
    },

    /// The embedded prompt templates failed to compile.
    #[error("failed to build prompt templates: {source}")]
    Prompts {
        /// The underlying template error.
        #[from]
        source: PromptError,
    },
}

/// Drives all agents through sequential per-tick turns.
pub struct Scheduler<P, F> {
    registry: Arc<Mutex<BTreeMap<AgentId, AgentRuntime>>>,
    persistence: Arc<P>,
    fanout: Arc<F>,
    generator: Arc<TextGenerator>,
    prompts: Arc<PromptSet>,
    memory: MemoryConfig,
    control: Arc<ControlState>,
}

impl<P: Persistence, F: Fanout> Scheduler<P, F> {
    /// Assemble a scheduler over its collaborators.
    ///
    /// `base_tick_ms` is the inter-tick sleep at 1.0x speed.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Prompts`] if the embedded templates
    /// fail to compile.
    pub fn new(
        persistence: P,
        fanout: F,
        generator: TextGenerator,
        memory: MemoryConfig,
        base_tick_ms: u64,
    ) -> Result<Self, SchedulerError> {
        Ok(Self {
            registry: Arc::new(Mutex::new(BTreeMap::new())),
            persistence: Arc::new(persistence),
            fanout: Arc::new(fanout),
            generator: Arc::new(generator),
            prompts: Arc::new(PromptSet::new()?),
            memory,
            control: Arc::new(ControlState::new(base_tick_ms)),
        })
    }

    /// A clonable control surface over this world.
    pub fn handle(&self) -> WorldHandle {
        WorldHandle::new(Arc::clone(&self.registry), Arc::clone(&self.control))
    }

    /// Load all stored agents, replacing the current registry.
    ///
    /// Returns the number of agents loaded.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Load`] when the store is unreachable;
    /// a world cannot start without its population.
    pub async fn load(&self) -> Result<usize, SchedulerError> {
        let seeds = self.persistence.load_all_agents().await?;
        let mut loaded = BTreeMap::new();
        for seed in seeds {
            let memory = MemoryStore::new(
                self.memory,
                Summarizer::new(Arc::clone(&self.generator), Arc::clone(&self.prompts)),
            );
            let planner = Planner::new(
                seed.name.clone(),
                seed.personality.clone(),
                Arc::clone(&self.generator),
                Arc::clone(&self.prompts),
            );
            loaded.insert(seed.id, AgentRuntime::new(seed, memory, planner));
        }
        let count = loaded.len();
        *self.registry.lock().await = loaded;
        info!(agents = count, "agents loaded");
        Ok(count)
    }

    /// Run the world loop until a stop is requested.
    ///
    /// Each iteration runs one full tick, then sleeps for the current
    /// speed-scaled interval. A stop request takes effect at the next
    /// turn boundary; the in-progress agent turn always completes.
    pub async fn run(&self) {
        self.control.set_running(true);
        info!("world loop started");
        while !self.control.stop_requested() {
            self.tick().await;
            if self.control.stop_requested() {
                break;
            }
            self.control.sleep_between_ticks().await;
        }
        self.control.set_running(false);
        info!("world loop stopped");
    }

    /// Run one tick: a full turn for every agent, in ascending id order.
    ///
    /// The id snapshot is taken once at tick start; agents added or
    /// removed mid-tick are picked up next tick.
    pub async fn tick(&self) {
        let ids: Vec<AgentId> = self.registry.lock().await.keys().copied().collect();
        debug!(agents = ids.len(), "tick start");
        for id in ids {
            if self.control.stop_requested() {
                break;
            }
            self.agent_turn(id).await;
        }
    }

    /// One agent's turn: decide, route the action, sync state.
    ///
    /// Holds the registry lock for the whole turn, so injections and
    /// observer reads land between turns.
    async fn agent_turn(&self, id: AgentId) {
        let mut registry = self.registry.lock().await;

        let (actor_name, peer_names, id_by_name) = {
            let Some(agent) = registry.get(&id) else {
                return;
            };
            let actor_name = agent.name().to_owned();
            let mut peer_names = Vec::new();
            let mut id_by_name = BTreeMap::new();
            for (peer_id, peer) in registry.iter() {
                id_by_name.insert(peer.name().to_owned(), *peer_id);
                if *peer_id != id {
                    peer_names.push(peer.name().to_owned());
                }
            }
            (actor_name, peer_names, id_by_name)
        };

        let (action, actor_mood) = {
            let Some(agent) = registry.get_mut(&id) else {
                return;
            };
            let action = agent.act(&peer_names, &id_by_name).await;
            (action, agent.mood_label().persisted())
        };

        match action {
            Action::Message { target, content } => {
                // Self-addressed and unknown targets fall back to a
                // monologue rather than failing the turn.
                let resolved = id_by_name.get(&target).copied().filter(|t| *t != id);
                if let Some(target_id) = resolved {
                    self.deliver(&mut registry, id, &actor_name, actor_mood, target_id, &content)
                        .await;
                } else {
                    let event = EventRecord::new(format!("{actor_name}: {content}"))
                        .with_actor(id)
                        .with_mood(actor_mood);
                    self.record_event(event).await;
                }
            }
            Action::Reflect => {
                let event = EventRecord::new(format!("{actor_name} is lost in thought..."))
                    .with_actor(id)
                    .with_mood(actor_mood);
                self.record_event(event).await;
            }
        }

        self.sync_mood(&registry, id).await;
    }

    /// Route a message to a resolved recipient.
    ///
    /// Records the exchange as an event, appends the message row,
    /// applies the delivery delta to the recipient with the sender as
    /// provenance, and persists the recipient's updated relationship
    /// toward the sender.
    async fn deliver(
        &self,
        registry: &mut BTreeMap<AgentId, AgentRuntime>,
        from: AgentId,
        from_name: &str,
        from_mood: PersistedMood,
        to: AgentId,
        content: &str,
    ) {
        let Some(target) = registry.get_mut(&to) else {
            return;
        };
        let to_name = target.name().to_owned();

        target.perceive(
            &format!("{from_name} said: {content}"),
            MESSAGE_DELTA,
            Some(from),
        );
        let kind = RelationKind::from_affinity(target.affinity(from));

        if let Err(error) = self.persistence.append_message(from, to, content).await {
            warn!(%error, "message persist failed, skipping");
        }
        if let Err(error) = self
            .persistence
            .upsert_relationship(to, from, kind, MESSAGE_DELTA)
            .await
        {
            warn!(%error, "relationship persist failed, skipping");
        }

        let event = EventRecord::new(format!("{from_name} → {to_name}: {content}"))
            .with_actor(from)
            .with_target(to)
            .with_mood(from_mood)
            .with_relation(kind, MESSAGE_DELTA);
        self.record_event(event).await;
        self.sync_mood(registry, to).await;
    }

    /// Persist an event (log-and-skip on failure) and broadcast it.
    async fn record_event(&self, event: EventRecord) {
        if let Err(error) = self.persistence.append_event(&event).await {
            warn!(%error, "event persist failed, skipping");
        }
        self.fanout.broadcast(&BroadcastPayload::Event(event));
    }

    /// Persist and broadcast one agent's current mood.
    async fn sync_mood(&self, registry: &BTreeMap<AgentId, AgentRuntime>, id: AgentId) {
        let Some(agent) = registry.get(&id) else {
            return;
        };
        let mood = agent.mood_label().persisted();
        let mood_value = agent.mood_value();
        if let Err(error) = self.persistence.save_mood(id, mood, mood_value).await {
            warn!(%error, "mood persist failed, skipping");
        }
        self.fanout.broadcast(&BroadcastPayload::MoodUpdate(MoodUpdate {
            agent_id: id,
            mood,
            mood_value,
        }));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use uuid::Uuid;

    use terrarium_llm::ScriptedGenerator;
    use terrarium_types::{AgentSeed, PersistedMood};

    use super::*;
    use crate::fanout::{NoopFanout, RecordingFanout};
    use crate::persistence::MemoryPersistence;

    fn seed(n: u128, name: &str) -> AgentSeed {
        AgentSeed {
            id: AgentId::from(Uuid::from_u128(n)),
            name: name.to_owned(),
            personality: "test personality".to_owned(),
            mood_value: 0,
        }
    }

    fn world<F: Fanout>(
        seeds: Vec<AgentSeed>,
        generator: ScriptedGenerator,
        fanout: F,
    ) -> (Scheduler<MemoryPersistence, F>, MemoryPersistence) {
        let store = MemoryPersistence::with_seeds(seeds);
        let scheduler = Scheduler::new(
            store.clone(),
            fanout,
            TextGenerator::scripted(generator),
            MemoryConfig::default(),
            10_000,
        )
        .unwrap();
        (scheduler, store)
    }

    #[tokio::test]
    async fn tick_routes_messages_and_monologues() {
        // Ascending id order: Alice (1) acts before Bob (2). Both
        // target Alice, so Alice's own message becomes a monologue and
        // Bob's is delivered.
        let seeds = vec![seed(1, "Alice"), seed(2, "Bob")];
        let script = ScriptedGenerator::always(
            r#"{"type": "message", "target": "Alice", "content": "hello"}"#,
        );
        let (scheduler, store) = world(seeds, script, NoopFanout);

        assert_eq!(scheduler.load().await.unwrap(), 2);
        scheduler.tick().await;

        assert_eq!(
            store.event_contents(),
            vec!["Alice: hello", "Bob → Alice: hello"]
        );
        assert_eq!(
            store.messages(),
            vec![(
                AgentId::from(Uuid::from_u128(2)),
                AgentId::from(Uuid::from_u128(1)),
                "hello".to_owned()
            )]
        );
    }

    #[tokio::test]
    async fn delivery_updates_recipient_mood_and_relationship() {
        let alice = AgentId::from(Uuid::from_u128(1));
        let bob = AgentId::from(Uuid::from_u128(2));
        let seeds = vec![seed(1, "Alice"), seed(2, "Bob")];
        let script = ScriptedGenerator::always(
            r#"{"type": "message", "target": "Alice", "content": "hello"}"#,
        );
        let (scheduler, store) = world(seeds, script, NoopFanout);
        scheduler.load().await.unwrap();
        scheduler.tick().await;

        // Alice received Bob's message: mood +3, affinity toward Bob +3.
        assert_eq!(store.mood_of(alice), Some((PersistedMood::Neutral, 3)));
        assert_eq!(
            store.relationship_of(alice, bob),
            Some((RelationKind::Neutral, 3))
        );
        // No reverse edge was written.
        assert_eq!(store.relationship_of(bob, alice), None);
    }

    #[tokio::test]
    async fn reflect_records_thinking_event() {
        let seeds = vec![seed(1, "Alice")];
        let script = ScriptedGenerator::always(r#"{"type": "reflect"}"#);
        let (scheduler, store) = world(seeds, script, NoopFanout);
        scheduler.load().await.unwrap();
        scheduler.tick().await;

        assert_eq!(store.event_contents(), vec!["Alice is lost in thought..."]);
    }

    #[tokio::test]
    async fn events_record_the_actors_mood() {
        let mut alice = seed(1, "Alice");
        alice.mood_value = 25;
        let seeds = vec![alice, seed(2, "Bob")];
        let script = ScriptedGenerator::new([
            r#"{"type": "reflect"}"#,
            r#"{"type": "message", "target": "Alice", "content": "hello"}"#,
        ]);
        let (scheduler, store) = world(seeds, script, NoopFanout);
        scheduler.load().await.unwrap();
        scheduler.tick().await;

        let events = store.events();
        assert_eq!(events.len(), 2);
        // Alice reflects at mood 25.
        assert_eq!(events.first().unwrap().mood_after, Some(PersistedMood::Happy));
        // Bob messages Alice at mood 0; mood_after is the sender's.
        assert_eq!(events.get(1).unwrap().mood_after, Some(PersistedMood::Neutral));
    }

    #[tokio::test]
    async fn identical_worlds_produce_identical_logs() {
        let seeds = vec![seed(1, "Alice"), seed(2, "Bob"), seed(3, "Carol")];
        let script = || {
            ScriptedGenerator::new([
                r#"{"type": "message", "target": "Bob", "content": "morning"}"#,
                r#"{"type": "reflect"}"#,
                r#"{"type": "message", "target": "Alice", "content": "hi back"}"#,
            ])
        };

        let (first, first_store) = world(seeds.clone(), script(), NoopFanout);
        first.load().await.unwrap();
        first.tick().await;

        let (second, second_store) = world(seeds, script(), NoopFanout);
        second.load().await.unwrap();
        second.tick().await;

        let log = first_store.event_contents();
        assert_eq!(log, second_store.event_contents());
        assert_eq!(
            log,
            vec![
                "Alice → Bob: morning",
                "Bob is lost in thought...",
                "Carol → Alice: hi back",
            ]
        );
    }

    #[tokio::test]
    async fn later_turns_see_earlier_effects_in_same_tick() {
        // Alice greets Bob first; when Bob acts in the same tick, his
        // fallback relations snapshot already includes the +3 affinity.
        let seeds = vec![seed(1, "Alice"), seed(2, "Bob")];
        let script = ScriptedGenerator::new([
            r#"{"type": "message", "target": "Bob", "content": "greetings"}"#,
            // Bob's turn: generation fails, fallback message fires.
        ]);
        let (scheduler, store) = world(seeds, script, NoopFanout);
        scheduler.load().await.unwrap();
        scheduler.tick().await;

        let log = store.event_contents();
        assert_eq!(log.first().map(String::as_str), Some("Alice → Bob: greetings"));
        let bob_line = log.get(1).unwrap();
        assert!(bob_line.contains("Alice: 3"), "got {bob_line}");
    }

    #[tokio::test]
    async fn persistence_failures_do_not_abort_the_tick() {
        let seeds = vec![seed(1, "Alice"), seed(2, "Bob")];
        let script = ScriptedGenerator::always(
            r#"{"type": "message", "target": "Alice", "content": "hello"}"#,
        );
        let fanout = RecordingFanout::new();
        let (scheduler, store) = world(seeds, script, fanout.clone());
        scheduler.load().await.unwrap();

        store.fail_writes(true);
        scheduler.tick().await;

        // Nothing persisted, but both turns completed and broadcast.
        assert!(store.event_contents().is_empty());
        let events = fanout
            .payloads()
            .into_iter()
            .filter(|p| matches!(p, BroadcastPayload::Event(_)))
            .count();
        assert_eq!(events, 2);
    }

    #[tokio::test]
    async fn stop_request_halts_at_turn_boundary() {
        let seeds = vec![seed(1, "Alice"), seed(2, "Bob")];
        let script = ScriptedGenerator::always(r#"{"type": "reflect"}"#);
        let (scheduler, store) = world(seeds, script, NoopFanout);
        scheduler.load().await.unwrap();

        scheduler.handle().request_stop();
        scheduler.tick().await;
        assert!(store.event_contents().is_empty());

        // run() with a pending stop returns without ticking.
        scheduler.run().await;
        assert!(!scheduler.handle().is_running());
        assert!(store.event_contents().is_empty());
    }

    #[tokio::test]
    async fn injections_reach_agents_between_turns() {
        let alice = AgentId::from(Uuid::from_u128(1));
        let seeds = vec![seed(1, "Alice"), seed(2, "Bob")];
        let script = ScriptedGenerator::always(r#"{"type": "reflect"}"#);
        let (scheduler, _store) = world(seeds, script, NoopFanout);
        scheduler.load().await.unwrap();
        let handle = scheduler.handle();

        let touched = handle.inject_event("It starts to rain.", Some(alice)).await;
        assert_eq!(touched, 1);

        assert_eq!(
            handle.inject_message("Alice", "op", "hello there").await,
            Some(alice)
        );
        assert_eq!(handle.inject_message("Nobody", "op", "hi").await, None);

        let overview = handle.overview().await;
        let alice_view = overview.iter().find(|a| a.name == "Alice").unwrap();
        let bob_view = overview.iter().find(|a| a.name == "Bob").unwrap();
        assert_eq!(alice_view.mood_value, 5);
        assert_eq!(bob_view.mood_value, 2);
    }
}

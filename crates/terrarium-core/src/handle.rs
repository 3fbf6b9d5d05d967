//! The clonable control surface handed to observer frontends.
//!
//! A [`WorldHandle`] carries shared references to the agent registry and
//! the run-control flags. Injections and reads lock the registry, so
//! they interleave with the scheduler at agent-turn granularity: an
//! injection lands either before or after a turn, never inside one.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::info;

use terrarium_agents::AgentRuntime;
use terrarium_types::{AgentId, PersistedMood};

use crate::control::ControlState;

/// Mood delta applied when a world event is injected.
const EVENT_INJECT_DELTA: i32 = 2;

/// Mood and affinity delta applied when a user message is injected.
const USER_MESSAGE_DELTA: i32 = 5;

/// One agent's public state, as reported by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentOverview {
    /// The agent's identity.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Immutable personality descriptor.
    pub personality: String,
    /// Canonical persisted mood label.
    pub mood: PersistedMood,
    /// Raw mood value.
    pub mood_value: i32,
    /// The agent's last recorded intent (empty before its first turn).
    pub current_intent: String,
}

/// Clonable handle for observing and steering a running world.
#[derive(Clone)]
pub struct WorldHandle {
    registry: Arc<Mutex<BTreeMap<AgentId, AgentRuntime>>>,
    control: Arc<ControlState>,
}

impl WorldHandle {
    pub(crate) const fn new(
        registry: Arc<Mutex<BTreeMap<AgentId, AgentRuntime>>>,
        control: Arc<ControlState>,
    ) -> Self {
        Self { registry, control }
    }

    /// The currently applied speed multiplier.
    pub fn speed(&self) -> f64 {
        self.control.speed()
    }

    /// Set the speed multiplier, clamping to 0.5..=5.0. Returns the
    /// applied value.
    pub fn set_speed(&self, multiplier: f64) -> f64 {
        let applied = self.control.set_speed(multiplier);
        info!(speed = applied, "simulation speed changed");
        applied
    }

    /// Ask the world loop to stop after the current agent turn.
    pub fn request_stop(&self) {
        info!("stop requested");
        self.control.request_stop();
    }

    /// Whether the world loop is currently running.
    pub fn is_running(&self) -> bool {
        self.control.is_running()
    }

    /// Number of loaded agents.
    pub async fn agent_count(&self) -> usize {
        self.registry.lock().await.len()
    }

    /// Public state of every loaded agent, in id order.
    pub async fn overview(&self) -> Vec<AgentOverview> {
        let registry = self.registry.lock().await;
        registry
            .values()
            .map(|agent| AgentOverview {
                id: agent.id(),
                name: agent.name().to_owned(),
                personality: agent.personality().to_owned(),
                mood: agent.mood_label().persisted(),
                mood_value: agent.mood_value(),
                current_intent: agent.current_intent().to_owned(),
            })
            .collect()
    }

    /// Inject a world event perceived by every agent except `actor`.
    ///
    /// Each touched agent remembers `[World event] {text}` and gains a
    /// small positive mood delta with no peer attribution. Returns the
    /// number of agents touched.
    pub async fn inject_event(&self, text: &str, actor: Option<AgentId>) -> usize {
        let perceived = format!("[World event] {text}");
        let mut registry = self.registry.lock().await;
        let mut touched = 0_usize;
        for (id, agent) in registry.iter_mut() {
            if actor == Some(*id) {
                continue;
            }
            agent.perceive(&perceived, EVENT_INJECT_DELTA, None);
            touched = touched.saturating_add(1);
        }
        info!(touched, "world event injected");
        touched
    }

    /// Inject a user message to the agent named `target_name`.
    ///
    /// The target perceives `User ({from}) said to you: {content}` with
    /// a positive mood delta and no peer attribution (the sender is not
    /// a registered agent). Returns the target's id, or `None` when no
    /// agent has that name.
    pub async fn inject_message(
        &self,
        target_name: &str,
        from: &str,
        content: &str,
    ) -> Option<AgentId> {
        let perceived = format!("User ({from}) said to you: {content}");
        let mut registry = self.registry.lock().await;
        let target = registry
            .values_mut()
            .find(|agent| agent.name() == target_name)?;
        target.perceive(&perceived, USER_MESSAGE_DELTA, None);
        let id = target.id();
        info!(target = %id, "user message injected");
        Some(id)
    }
}

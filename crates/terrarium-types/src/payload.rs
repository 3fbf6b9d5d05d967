//! Live-update payloads pushed to observers over the `WebSocket`.
//!
//! Clients receive a JSON-encoded [`BroadcastPayload`] for every world
//! event and mood change. The `type` tag discriminates the variants on
//! the wire: `event` and `mood_update`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::event::EventRecord;
use crate::ids::AgentId;
use crate::mood::PersistedMood;

/// A mood change notification for one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MoodUpdate {
    /// The agent whose mood changed.
    pub agent_id: AgentId,
    /// The persisted mood label after the change.
    pub mood: PersistedMood,
    /// The raw mood value after the change.
    pub mood_value: i32,
}

/// A tagged live-update message pushed to all connected observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum BroadcastPayload {
    /// A world event was recorded.
    Event(EventRecord),
    /// An agent's mood changed.
    MoodUpdate(MoodUpdate),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn payload_tags_match_wire_contract() {
        let event = BroadcastPayload::Event(EventRecord::new("something happened"));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "event");

        let mood = BroadcastPayload::MoodUpdate(MoodUpdate {
            agent_id: AgentId::new(),
            mood: PersistedMood::Happy,
            mood_value: 25,
        });
        let json = serde_json::to_value(&mood).unwrap();
        assert_eq!(json["type"], "mood_update");
        assert_eq!(json["data"]["mood"], "happy");
    }
}

//! The action an agent produces each turn.
//!
//! Actions cross the LLM boundary as JSON, so the serde representation
//! here is the wire contract: a lowercase `type` tag with `target` and
//! `content` fields for messages. A reflect action carries no fields.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Sentinel target name used when an agent has nobody to address.
pub const NOBODY: &str = "nobody";

/// The tagged decision an agent produces each turn.
///
/// Produced once per agent per tick by the planner; consumed by the
/// scheduler, which routes it and derives an event record from it. Never
/// persisted as a first-class entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    /// Say something to a named peer.
    Message {
        /// Display name of the peer being addressed.
        target: String,
        /// What is being said.
        content: String,
    },
    /// Turn inward for this tick; no target, no message.
    Reflect,
}

impl Action {
    /// A short human-readable summary of the action, used for the
    /// agent's "current intent" field. Truncated to `max_chars`.
    pub fn intent_summary(&self, max_chars: usize) -> String {
        match self {
            Self::Message { content, .. } => content.chars().take(max_chars).collect(),
            Self::Reflect => "Reflecting...".to_owned(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn message_serializes_with_type_tag() {
        let action = Action::Message {
            target: "Alice".to_owned(),
            content: "hello".to_owned(),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["target"], "Alice");
        assert_eq!(json["content"], "hello");
    }

    #[test]
    fn reflect_parses_without_fields() {
        let action: Action = serde_json::from_str(r#"{"type":"reflect"}"#).unwrap();
        assert_eq!(action, Action::Reflect);
    }

    #[test]
    fn intent_summary_truncates_on_char_boundary() {
        let action = Action::Message {
            target: "Bob".to_owned(),
            content: "é".repeat(80),
        };
        let summary = action.intent_summary(50);
        assert_eq!(summary.chars().count(), 50);
    }
}

//! Read-side views over persisted history.
//!
//! These are the shapes the observer's read endpoints serve: events
//! and relationships as stored, joined with display names so the
//! frontend never resolves ids itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{AgentId, EventId};
use crate::mood::{PersistedMood, RelationKind};

/// A persisted event joined with the names of its participants.
///
/// Names are resolved at read time; an event whose participants were
/// removed still renders with `None` names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StoredEvent {
    /// Storage-assigned event id.
    pub id: EventId,
    /// Human-readable description of the event.
    pub content: String,
    /// Display name of the causing agent, if known.
    pub actor_name: Option<String>,
    /// Display name of the targeted agent, if known.
    pub target_name: Option<String>,
    /// The actor's persisted mood after the event, if recorded.
    pub mood_after: Option<PersistedMood>,
    /// Relationship kind recorded with the event, if any.
    pub relation_kind: Option<RelationKind>,
    /// Affinity change applied as part of the event.
    pub relation_delta: i32,
    /// When the event was created.
    pub created_at: DateTime<Utc>,
}

/// A persisted directed relationship with its display adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RelationshipView {
    /// The agent holding the sentiment.
    pub from_id: AgentId,
    /// The agent the sentiment is directed at.
    pub to_id: AgentId,
    /// Display name of the holder, if known.
    pub from_name: Option<String>,
    /// Display name of the target, if known.
    pub to_name: Option<String>,
    /// Stored relationship kind.
    pub kind: RelationKind,
    /// Raw accumulated strength.
    pub strength: i32,
    /// Strength adjusted by the endpoints' current moods; see
    /// [`mood_adjusted_strength`].
    pub display_strength: i32,
}

/// Adjust a displayed relationship strength by the endpoints' moods.
///
/// The average of both agents' mood impacts is added to the base
/// strength for every kind except [`RelationKind::Tension`], where it
/// is subtracted (a shared good mood softens tension). The result is
/// clamped to `[0, 100]`. Missing moods contribute no impact.
pub fn mood_adjusted_strength(
    base: i32,
    from: Option<PersistedMood>,
    to: Option<PersistedMood>,
    kind: RelationKind,
) -> i32 {
    let impact = |mood: Option<PersistedMood>| mood.map_or(0, PersistedMood::social_impact);
    // Impacts are all even, so halving the sum is exact.
    let avg = impact(from).saturating_add(impact(to)).saturating_div(2);
    let adjusted = if kind == RelationKind::Tension {
        base.saturating_sub(avg)
    } else {
        base.saturating_add(avg)
    };
    adjusted.clamp(0, 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_good_mood_strengthens_positive_ties() {
        let display = mood_adjusted_strength(
            40,
            Some(PersistedMood::Happy),
            Some(PersistedMood::Happy),
            RelationKind::Respect,
        );
        assert_eq!(display, 50);
    }

    #[test]
    fn shared_good_mood_softens_tension() {
        let display = mood_adjusted_strength(
            30,
            Some(PersistedMood::Happy),
            Some(PersistedMood::Happy),
            RelationKind::Tension,
        );
        assert_eq!(display, 20);
    }

    #[test]
    fn missing_moods_leave_strength_unchanged() {
        assert_eq!(
            mood_adjusted_strength(55, None, None, RelationKind::Friends),
            55
        );
    }

    #[test]
    fn display_strength_is_clamped() {
        assert_eq!(
            mood_adjusted_strength(
                98,
                Some(PersistedMood::Happy),
                Some(PersistedMood::Happy),
                RelationKind::Friends,
            ),
            100
        );
        assert_eq!(
            mood_adjusted_strength(
                5,
                Some(PersistedMood::Angry),
                Some(PersistedMood::Angry),
                RelationKind::Neutral,
            ),
            0
        );
    }
}

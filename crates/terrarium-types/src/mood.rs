//! Mood and relation label vocabularies.
//!
//! There are two label sets in the system and exactly one mapping between
//! them, defined here:
//!
//! - [`MoodLabel`] is the internal five-bucket mood vocabulary, a pure
//!   function of the clamped mood value.
//! - [`PersistedMood`] is the vocabulary stored in the database and shown
//!   to observers.
//!
//! The scheduler converts at its persistence boundary via
//! [`MoodLabel::persisted`]; no other code defines label strings.
//! [`RelationKind`] works the same way for relationship records: one
//! vocabulary, one derivation from the affinity value.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Lower bound of the mood and affinity scales.
pub const SCALE_MIN: i32 = -100;

/// Upper bound of the mood and affinity scales.
pub const SCALE_MAX: i32 = 100;

/// Clamp a scalar to the shared `[-100, 100]` scale.
pub const fn clamp_scale(value: i32) -> i32 {
    if value < SCALE_MIN {
        SCALE_MIN
    } else if value > SCALE_MAX {
        SCALE_MAX
    } else {
        value
    }
}

/// Internal five-bucket mood vocabulary.
///
/// Derived from the mood value via fixed, non-overlapping boundaries;
/// never stored independently of the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum MoodLabel {
    /// Mood below -60.
    Terrible,
    /// Mood in `[-60, -20)`.
    Bad,
    /// Mood in `[-20, 20)`.
    Neutral,
    /// Mood in `[20, 60)`.
    Good,
    /// Mood of 60 and above.
    Excellent,
}

impl MoodLabel {
    /// Derive the label from a mood value.
    ///
    /// The value is clamped to the scale first, so out-of-range inputs
    /// map to the boundary buckets.
    pub const fn from_value(value: i32) -> Self {
        let value = clamp_scale(value);
        if value < -60 {
            Self::Terrible
        } else if value < -20 {
            Self::Bad
        } else if value < 20 {
            Self::Neutral
        } else if value < 60 {
            Self::Good
        } else {
            Self::Excellent
        }
    }

    /// The lowercase label text used in prompts.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Terrible => "terrible",
            Self::Bad => "bad",
            Self::Neutral => "neutral",
            Self::Good => "good",
            Self::Excellent => "excellent",
        }
    }

    /// The persisted vocabulary this label maps to.
    ///
    /// This is the single mood mapping table in the system.
    pub const fn persisted(self) -> PersistedMood {
        match self {
            Self::Terrible => PersistedMood::Angry,
            Self::Bad => PersistedMood::Sad,
            Self::Neutral => PersistedMood::Neutral,
            Self::Good | Self::Excellent => PersistedMood::Happy,
        }
    }
}

impl core::fmt::Display for MoodLabel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mood vocabulary stored in the database and broadcast to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum PersistedMood {
    /// The agent is visibly upset.
    Angry,
    /// The agent is downcast.
    Sad,
    /// Baseline state.
    Neutral,
    /// The agent is content.
    Happy,
    /// The agent is frightened. Never derived from a mood value; only
    /// settable through the external API.
    Scared,
}

impl PersistedMood {
    /// The lowercase label text stored in the database.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Angry => "angry",
            Self::Sad => "sad",
            Self::Neutral => "neutral",
            Self::Happy => "happy",
            Self::Scared => "scared",
        }
    }

    /// Parse a stored label back into the vocabulary.
    ///
    /// Returns `None` for unknown text; readers treat that as an
    /// absent label rather than failing the whole query.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "angry" => Some(Self::Angry),
            "sad" => Some(Self::Sad),
            "neutral" => Some(Self::Neutral),
            "happy" => Some(Self::Happy),
            "scared" => Some(Self::Scared),
            _ => None,
        }
    }

    /// How this mood colors the displayed strength of a relationship.
    ///
    /// Used by the relationship read surface to adjust the raw stored
    /// strength by the current moods of both endpoints.
    pub const fn social_impact(self) -> i32 {
        match self {
            Self::Happy => 10,
            Self::Neutral => 0,
            Self::Sad => -8,
            Self::Scared => -10,
            Self::Angry => -16,
        }
    }
}

impl core::fmt::Display for PersistedMood {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship vocabulary stored alongside affinity deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    /// Strong positive bond.
    Friends,
    /// Positive regard short of friendship.
    Respect,
    /// No notable sentiment either way.
    Neutral,
    /// Negative sentiment.
    Tension,
    /// Protective attachment. Accepted from the external API but never
    /// derived from an affinity value.
    Care,
}

impl RelationKind {
    /// Derive the relation kind from a directional affinity value.
    pub const fn from_affinity(affinity: i32) -> Self {
        let affinity = clamp_scale(affinity);
        if affinity >= 60 {
            Self::Friends
        } else if affinity >= 20 {
            Self::Respect
        } else if affinity > -20 {
            Self::Neutral
        } else {
            Self::Tension
        }
    }

    /// The lowercase label text stored in the database.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Friends => "friends",
            Self::Respect => "respect",
            Self::Neutral => "neutral",
            Self::Tension => "tension",
            Self::Care => "care",
        }
    }

    /// Parse a stored label back into the vocabulary.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "friends" => Some(Self::Friends),
            "respect" => Some(Self::Respect),
            "neutral" => Some(Self::Neutral),
            "tension" => Some(Self::Tension),
            "care" => Some(Self::Care),
            _ => None,
        }
    }
}

impl core::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

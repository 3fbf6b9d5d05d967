//! Shared type definitions for the Terrarium simulation.
//!
//! This crate is the single source of truth for the types that cross
//! crate boundaries in the Terrarium workspace. Wire-facing types flow
//! downstream to `TypeScript` via `ts-rs` for the observer frontend.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for entity identifiers
//! - [`mood`] -- Mood/relation label vocabularies and the one mapping table
//! - [`action`] -- The tagged per-turn agent decision
//! - [`event`] -- Immutable world event records and agent seed rows
//! - [`history`] -- Read-side views over persisted history
//! - [`payload`] -- Live-update payloads pushed over the `WebSocket`

pub mod action;
pub mod event;
pub mod history;
pub mod ids;
pub mod mood;
pub mod payload;

// Re-export all public types at crate root for convenience.
pub use action::{Action, NOBODY};
pub use event::{AgentSeed, EventRecord};
pub use history::{RelationshipView, StoredEvent, mood_adjusted_strength};
pub use ids::{AgentId, EventId};
pub use mood::{MoodLabel, PersistedMood, RelationKind, SCALE_MAX, SCALE_MIN, clamp_scale};
pub use payload::{BroadcastPayload, MoodUpdate};

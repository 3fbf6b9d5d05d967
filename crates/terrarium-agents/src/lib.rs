//! Agent-local state for the Terrarium simulation.
//!
//! Everything an individual agent owns lives in this crate: bounded
//! mood, directional peer affinities, episodic memory with automatic
//! consolidation, and the runtime that composes them into a `perceive`/
//! `act` entity. Nothing here knows about persistence, HTTP, or the
//! scheduler; cross-agent effects are sequenced one level up.
//!
//! # Modules
//!
//! - [`emotion`] -- clamped scalar mood with derived labels
//! - [`relationship`] -- directed bounded affinity table
//! - [`memory`] -- episodic store, consolidation, similarity search
//! - [`agent`] -- the composed agent runtime

pub mod agent;
pub mod emotion;
pub mod memory;
pub mod relationship;

pub use agent::AgentRuntime;
pub use emotion::EmotionState;
pub use memory::{LexicalIndex, MemoryConfig, MemoryItem, MemoryKind, MemoryStore, VectorIndex};
pub use relationship::RelationshipTable;

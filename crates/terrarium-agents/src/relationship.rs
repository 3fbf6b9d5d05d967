//! Directed affinity scores toward other agents.
//!
//! One table per agent. Affinities are bounded to `[-100, 100]` and
//! directional: A's affinity toward B is independent of B's toward A.
//! Peers the agent has never interacted with are not materialized; they
//! read as 0.

use std::collections::BTreeMap;

use terrarium_types::{AgentId, clamp_scale};

/// Per-agent map of peer affinities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipTable {
    affinities: BTreeMap<AgentId, i32>,
}

impl RelationshipTable {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            affinities: BTreeMap::new(),
        }
    }

    /// Current affinity toward `peer`; 0 when never updated.
    pub fn affinity(&self, peer: AgentId) -> i32 {
        self.affinities.get(&peer).copied().unwrap_or(0)
    }

    /// Add `delta` to the affinity toward `peer`, clamping to scale.
    ///
    /// Returns the new value.
    pub fn update(&mut self, peer: AgentId, delta: i32) -> i32 {
        let new_value = clamp_scale(self.affinity(peer).saturating_add(delta));
        self.affinities.insert(peer, new_value);
        new_value
    }

    /// A snapshot copy of all materialized affinities.
    ///
    /// Callers receive an owned map and cannot mutate internal state
    /// through it.
    pub fn all(&self) -> BTreeMap<AgentId, i32> {
        self.affinities.clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn unseen_peer_reads_zero_and_is_not_materialized() {
        let table = RelationshipTable::new();
        assert_eq!(table.affinity(AgentId::new()), 0);
        assert!(table.all().is_empty());
    }

    #[test]
    fn updates_accumulate_and_clamp() {
        let mut table = RelationshipTable::new();
        let peer = AgentId::new();
        assert_eq!(table.update(peer, 30), 30);
        assert_eq!(table.update(peer, 40), 70);
        assert_eq!(table.update(peer, 90), 100);
        assert_eq!(table.update(peer, -250), -100);
    }

    #[test]
    fn tables_are_directional_by_construction() {
        let a = AgentId::new();
        let mut table_of_b = RelationshipTable::new();
        table_of_b.update(a, -15);
        // A separate table for A knows nothing about B's sentiment.
        let table_of_a = RelationshipTable::new();
        assert_eq!(table_of_b.affinity(a), -15);
        assert_eq!(table_of_a.all().len(), 0);
    }

    #[test]
    fn snapshot_is_a_copy() {
        let mut table = RelationshipTable::new();
        let peer = AgentId::new();
        table.update(peer, 10);
        let mut snapshot = table.all();
        snapshot.insert(peer, 99);
        assert_eq!(table.affinity(peer), 10);
    }
}

//! The `PostgreSQL` implementation of the core persistence seam.
//!
//! Agents, events, messages, and relationships each map to one table
//! (see `migrations/0001_init.sql`). Mood and relation labels are
//! stored as lowercase text; event ids are generated app-side.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use terrarium_core::{HistoryReader, Persistence, PersistenceError};
use terrarium_types::{
    AgentId, AgentSeed, EventId, EventRecord, PersistedMood, RelationKind, RelationshipView,
    StoredEvent, mood_adjusted_strength,
};

use crate::postgres::PostgresPool;

/// One row of the `agents` table.
#[derive(Debug, sqlx::FromRow)]
struct AgentRow {
    id: Uuid,
    name: String,
    personality: String,
    mood_value: i32,
}

impl AgentRow {
    fn into_seed(self) -> AgentSeed {
        AgentSeed {
            id: AgentId::from(self.id),
            name: self.name,
            personality: self.personality,
            mood_value: self.mood_value,
        }
    }
}

/// One `events` row joined with the participants' display names.
#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    content: String,
    actor_name: Option<String>,
    target_name: Option<String>,
    mood_after: Option<String>,
    relation_kind: Option<String>,
    relation_delta: i32,
    created_at: DateTime<Utc>,
}

impl EventRow {
    fn into_view(self) -> StoredEvent {
        StoredEvent {
            id: EventId::from(self.id),
            content: self.content,
            actor_name: self.actor_name,
            target_name: self.target_name,
            // Unknown stored labels render as absent rather than
            // failing the whole page.
            mood_after: self.mood_after.as_deref().and_then(PersistedMood::parse),
            relation_kind: self.relation_kind.as_deref().and_then(RelationKind::parse),
            relation_delta: self.relation_delta,
            created_at: self.created_at,
        }
    }
}

/// One `relationships` row joined with both endpoints' names and moods.
#[derive(Debug, sqlx::FromRow)]
struct RelationshipRow {
    from_id: Uuid,
    to_id: Uuid,
    kind: String,
    strength: i32,
    from_name: Option<String>,
    from_mood: Option<String>,
    to_name: Option<String>,
    to_mood: Option<String>,
}

impl RelationshipRow {
    fn into_view(self) -> RelationshipView {
        let kind = RelationKind::parse(&self.kind).unwrap_or(RelationKind::Neutral);
        let from_mood = self.from_mood.as_deref().and_then(PersistedMood::parse);
        let to_mood = self.to_mood.as_deref().and_then(PersistedMood::parse);
        RelationshipView {
            from_id: AgentId::from(self.from_id),
            to_id: AgentId::from(self.to_id),
            from_name: self.from_name,
            to_name: self.to_name,
            kind,
            strength: self.strength,
            display_strength: mood_adjusted_strength(self.strength, from_mood, to_mood, kind),
        }
    }
}

fn unavailable(error: &sqlx::Error) -> PersistenceError {
    PersistenceError::new(error.to_string())
}

/// Persistence over a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Bind a store to a connected pool.
    pub fn new(pool: &PostgresPool) -> Self {
        Self {
            pool: pool.pool().clone(),
        }
    }

    /// Insert agent rows, skipping ids that already exist.
    ///
    /// Used at engine start to seed a fresh database with a default
    /// population. Returns the number of rows actually inserted.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if any insert fails.
    pub async fn seed_agents(&self, seeds: &[AgentSeed]) -> Result<u64, PersistenceError> {
        let mut inserted = 0_u64;
        for seed in seeds {
            let result = sqlx::query(
                r"INSERT INTO agents (id, name, personality, mood, mood_value)
                  VALUES ($1, $2, $3, $4, $5)
                  ON CONFLICT (id) DO NOTHING",
            )
            .bind(seed.id.into_inner())
            .bind(&seed.name)
            .bind(&seed.personality)
            .bind(PersistedMood::Neutral.as_str())
            .bind(seed.mood_value)
            .execute(&self.pool)
            .await
            .map_err(|e| unavailable(&e))?;
            inserted = inserted.saturating_add(result.rows_affected());
        }
        tracing::info!(inserted, "Seeded agent rows");
        Ok(inserted)
    }

    /// Number of stored agent rows.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the query fails.
    pub async fn count_agents(&self) -> Result<i64, PersistenceError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM agents")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| unavailable(&e))?;
        Ok(count)
    }
}

impl Persistence for PgStore {
    async fn load_all_agents(&self) -> Result<Vec<AgentSeed>, PersistenceError> {
        let rows = sqlx::query_as::<_, AgentRow>(
            "SELECT id, name, personality, mood_value FROM agents ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| unavailable(&e))?;
        Ok(rows.into_iter().map(AgentRow::into_seed).collect())
    }

    async fn save_mood(
        &self,
        id: AgentId,
        mood: PersistedMood,
        mood_value: i32,
    ) -> Result<(), PersistenceError> {
        sqlx::query(
            "UPDATE agents SET mood = $2, mood_value = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id.into_inner())
        .bind(mood.as_str())
        .bind(mood_value)
        .execute(&self.pool)
        .await
        .map_err(|e| unavailable(&e))?;
        Ok(())
    }

    async fn append_event(&self, event: &EventRecord) -> Result<EventId, PersistenceError> {
        let id = EventId::new();
        sqlx::query(
            r"INSERT INTO events
                  (id, content, actor_id, target_id, mood_after, relation_kind, relation_delta, created_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(id.into_inner())
        .bind(&event.content)
        .bind(event.actor.map(AgentId::into_inner))
        .bind(event.target.map(AgentId::into_inner))
        .bind(event.mood_after.map(PersistedMood::as_str))
        .bind(event.relation_kind.map(RelationKind::as_str))
        .bind(event.relation_delta)
        .bind(event.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| unavailable(&e))?;
        Ok(id)
    }

    async fn append_message(
        &self,
        from: AgentId,
        to: AgentId,
        content: &str,
    ) -> Result<(), PersistenceError> {
        sqlx::query(
            r"INSERT INTO messages (id, from_id, to_id, content)
              VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(from.into_inner())
        .bind(to.into_inner())
        .bind(content)
        .execute(&self.pool)
        .await
        .map_err(|e| unavailable(&e))?;
        Ok(())
    }

    async fn upsert_relationship(
        &self,
        from: AgentId,
        to: AgentId,
        kind: RelationKind,
        delta: i32,
    ) -> Result<(), PersistenceError> {
        sqlx::query(
            r"INSERT INTO relationships (from_id, to_id, kind, strength)
              VALUES ($1, $2, $3, $4)
              ON CONFLICT (from_id, to_id) DO UPDATE
              SET kind = EXCLUDED.kind,
                  strength = relationships.strength + EXCLUDED.strength,
                  updated_at = NOW()",
        )
        .bind(from.into_inner())
        .bind(to.into_inner())
        .bind(kind.as_str())
        .bind(delta)
        .execute(&self.pool)
        .await
        .map_err(|e| unavailable(&e))?;
        Ok(())
    }
}

impl HistoryReader for PgStore {
    async fn recent_events(&self, limit: u32) -> Result<Vec<StoredEvent>, PersistenceError> {
        let rows = sqlx::query_as::<_, EventRow>(
            r"SELECT e.id, e.content, a.name AS actor_name, t.name AS target_name,
                     e.mood_after, e.relation_kind, e.relation_delta, e.created_at
              FROM events e
              LEFT JOIN agents a ON a.id = e.actor_id
              LEFT JOIN agents t ON t.id = e.target_id
              ORDER BY e.created_at DESC
              LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| unavailable(&e))?;
        Ok(rows.into_iter().map(EventRow::into_view).collect())
    }

    async fn relationships(&self) -> Result<Vec<RelationshipView>, PersistenceError> {
        let rows = sqlx::query_as::<_, RelationshipRow>(
            r"SELECT r.from_id, r.to_id, r.kind, r.strength,
                     f.name AS from_name, f.mood AS from_mood,
                     t.name AS to_name, t.mood AS to_mood
              FROM relationships r
              LEFT JOIN agents f ON f.id = r.from_id
              LEFT JOIN agents t ON t.id = r.to_id
              ORDER BY r.from_id, r.to_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| unavailable(&e))?;
        Ok(rows.into_iter().map(RelationshipRow::into_view).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_row_converts_to_seed() {
        let id = Uuid::new_v4();
        let row = AgentRow {
            id,
            name: "Ada".to_owned(),
            personality: "curious".to_owned(),
            mood_value: -7,
        };
        let seed = row.into_seed();
        assert_eq!(seed.id.into_inner(), id);
        assert_eq!(seed.name, "Ada");
        assert_eq!(seed.mood_value, -7);
    }

    #[test]
    fn event_row_drops_unknown_labels() {
        let row = EventRow {
            id: Uuid::new_v4(),
            content: "Ada → Bea: hi".to_owned(),
            actor_name: Some("Ada".to_owned()),
            target_name: Some("Bea".to_owned()),
            mood_after: Some("ecstatic".to_owned()),
            relation_kind: Some("respect".to_owned()),
            relation_delta: 3,
            created_at: Utc::now(),
        };
        let view = row.into_view();
        assert_eq!(view.mood_after, None);
        assert_eq!(view.relation_kind, Some(RelationKind::Respect));
        assert_eq!(view.actor_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn relationship_row_computes_display_strength() {
        let row = RelationshipRow {
            from_id: Uuid::new_v4(),
            to_id: Uuid::new_v4(),
            kind: "tension".to_owned(),
            strength: 30,
            from_name: Some("Ada".to_owned()),
            from_mood: Some("happy".to_owned()),
            to_name: Some("Bea".to_owned()),
            to_mood: Some("happy".to_owned()),
        };
        let view = row.into_view();
        assert_eq!(view.kind, RelationKind::Tension);
        assert_eq!(view.strength, 30);
        assert_eq!(view.display_strength, 20);
    }
}

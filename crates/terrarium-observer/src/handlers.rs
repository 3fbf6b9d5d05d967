//! REST handlers for world status, control, and injections.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/status` | World status and agent overview |
//! | `GET` | `/api/events` | Recent event history, newest first |
//! | `GET` | `/api/relationships` | Stored relationships with display strength |
//! | `POST` | `/api/control/stop` | Stop the world loop |
//! | `POST` | `/api/control/speed` | Set the speed multiplier |
//! | `POST` | `/api/inject/event` | Broadcast a world event to all agents |
//! | `POST` | `/api/inject/message` | Send a user message to one agent |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse};

use terrarium_core::HistoryReader;
use terrarium_types::{AgentId, BroadcastPayload, EventRecord};

use crate::error::ObserverError;
use crate::state::AppState;

/// Events served when the request names no limit.
const DEFAULT_EVENT_LIMIT: u32 = 20;

/// Hard cap on the number of events served per request.
const MAX_EVENT_LIMIT: u32 = 100;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/control/speed`.
#[derive(Debug, serde::Deserialize)]
pub struct SetSpeedRequest {
    /// New speed multiplier; clamped to `[0.5, 5.0]`.
    pub multiplier: f64,
}

/// Request body for `POST /api/inject/event`.
#[derive(Debug, serde::Deserialize)]
pub struct InjectEventRequest {
    /// Event description perceived by the agents.
    pub text: String,
    /// Optional agent treated as the event's cause; it does not
    /// perceive its own event.
    pub actor_id: Option<AgentId>,
}

/// Query parameters for `GET /api/events`.
#[derive(Debug, serde::Deserialize)]
pub struct EventsQuery {
    /// Maximum number of events to return; clamped to `1..=100`,
    /// default 20.
    pub limit: Option<u32>,
}

/// Request body for `POST /api/inject/message`.
#[derive(Debug, serde::Deserialize)]
pub struct InjectMessageRequest {
    /// Display name of the receiving agent.
    pub target: String,
    /// Name shown to the agent as the sender.
    pub from: String,
    /// Message text.
    pub content: String,
}

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

/// Minimal HTML landing page.
pub async fn index() -> Html<&'static str> {
    Html(
        "<!DOCTYPE html><html><head><title>Terrarium</title></head>\
         <body><h1>Terrarium Observer</h1>\
         <p>REST under <code>/api</code>, live updates at <code>/ws</code>.</p>\
         </body></html>",
    )
}

// ---------------------------------------------------------------------------
// GET /api/status
// ---------------------------------------------------------------------------

/// Current world status: loop liveness, speed, and the agent roster.
pub async fn status<H: HistoryReader>(
    State(state): State<Arc<AppState<H>>>,
) -> impl IntoResponse {
    let agents = state.handle.overview().await;
    Json(serde_json::json!({
        "running": state.handle.is_running(),
        "speed": state.handle.speed(),
        "agent_count": agents.len(),
        "agents": agents,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/events
// ---------------------------------------------------------------------------

/// Recent event history, newest first.
///
/// `?limit=N` bounds the page; it is clamped to `1..=100` and defaults
/// to 20.
pub async fn events<H: HistoryReader>(
    State(state): State<Arc<AppState<H>>>,
    Query(query): Query<EventsQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_EVENT_LIMIT)
        .clamp(1, MAX_EVENT_LIMIT);
    let events = state
        .history
        .recent_events(limit)
        .await
        .map_err(|e| ObserverError::Internal(e.to_string()))?;
    Ok(Json(events))
}

// ---------------------------------------------------------------------------
// GET /api/relationships
// ---------------------------------------------------------------------------

/// Every stored relationship, with the strength adjusted by both
/// endpoints' current moods for display.
pub async fn relationships<H: HistoryReader>(
    State(state): State<Arc<AppState<H>>>,
) -> Result<impl IntoResponse, ObserverError> {
    let views = state
        .history
        .relationships()
        .await
        .map_err(|e| ObserverError::Internal(e.to_string()))?;
    Ok(Json(views))
}

// ---------------------------------------------------------------------------
// POST /api/control/stop
// ---------------------------------------------------------------------------

/// Request a clean stop of the world loop.
///
/// The in-progress agent turn completes; nothing else runs afterwards.
pub async fn stop<H: HistoryReader>(State(state): State<Arc<AppState<H>>>) -> impl IntoResponse {
    state.handle.request_stop();
    Json(serde_json::json!({
        "ok": true,
        "message": "Stop requested",
    }))
}

// ---------------------------------------------------------------------------
// POST /api/control/speed
// ---------------------------------------------------------------------------

/// Set the speed multiplier, clamped to `[0.5, 5.0]`.
///
/// Takes effect from the next inter-tick sleep; an in-flight sleep is
/// re-timed immediately.
pub async fn set_speed<H: HistoryReader>(
    State(state): State<Arc<AppState<H>>>,
    Json(body): Json<SetSpeedRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    if !body.multiplier.is_finite() {
        return Err(ObserverError::InvalidRequest(
            "multiplier must be a finite number".to_owned(),
        ));
    }
    let applied = state.handle.set_speed(body.multiplier);
    Ok(Json(serde_json::json!({
        "ok": true,
        "requested": body.multiplier,
        "applied": applied,
    })))
}

// ---------------------------------------------------------------------------
// POST /api/inject/event
// ---------------------------------------------------------------------------

/// Inject a world event perceived by every agent (except the optional
/// actor). The event is also pushed to connected `WebSocket` clients.
pub async fn inject_event<H: HistoryReader>(
    State(state): State<Arc<AppState<H>>>,
    Json(body): Json<InjectEventRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    if body.text.trim().is_empty() {
        return Err(ObserverError::InvalidRequest(
            "text must not be empty".to_owned(),
        ));
    }
    let touched = state.handle.inject_event(&body.text, body.actor_id).await;

    let mut event = EventRecord::new(format!("[World event] {}", body.text));
    if let Some(actor) = body.actor_id {
        event = event.with_actor(actor);
    }
    state.publish(&BroadcastPayload::Event(event));

    Ok(Json(serde_json::json!({
        "ok": true,
        "agents_touched": touched,
    })))
}

// ---------------------------------------------------------------------------
// POST /api/inject/message
// ---------------------------------------------------------------------------

/// Send a user message to the named agent.
///
/// Returns 404 when no agent has that name.
pub async fn inject_message<H: HistoryReader>(
    State(state): State<Arc<AppState<H>>>,
    Json(body): Json<InjectMessageRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    if body.content.trim().is_empty() {
        return Err(ObserverError::InvalidRequest(
            "content must not be empty".to_owned(),
        ));
    }
    let Some(target_id) = state
        .handle
        .inject_message(&body.target, &body.from, &body.content)
        .await
    else {
        return Err(ObserverError::NotFound(format!(
            "no agent named {}",
            body.target
        )));
    };

    let event = EventRecord::new(format!(
        "User ({}) → {}: {}",
        body.from, body.target, body.content
    ))
    .with_target(target_id);
    state.publish(&BroadcastPayload::Event(event));

    Ok(Json(serde_json::json!({
        "ok": true,
        "target_id": target_id,
    })))
}

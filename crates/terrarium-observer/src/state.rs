//! Shared application state for the Observer API server.
//!
//! [`AppState`] pairs the world's control surface ([`WorldHandle`])
//! with the broadcast channel that fans live updates out to connected
//! `WebSocket` clients. [`ChannelFanout`] is the core-facing half of
//! that channel: the scheduler pushes payloads into it and every
//! subscriber sees the same stream.

use std::sync::Arc;

use tokio::sync::broadcast;

use terrarium_core::{Fanout, HistoryReader, WorldHandle};
use terrarium_types::BroadcastPayload;

/// Capacity of the broadcast channel for live updates.
///
/// If a subscriber falls behind by more than this many messages it will
/// receive a [`broadcast::error::RecvError::Lagged`] and skip to the
/// newest message.
const BROADCAST_CAPACITY: usize = 256;

/// The scheduler-side publisher of live updates.
///
/// Implements the core [`Fanout`] seam over a tokio broadcast channel.
/// Sending with zero receivers is normal and silently ignored.
#[derive(Clone)]
pub struct ChannelFanout {
    tx: broadcast::Sender<BroadcastPayload>,
}

impl ChannelFanout {
    /// Create a fanout with a fresh broadcast channel.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { tx }
    }

    /// A sender clone for wiring into [`AppState`].
    pub fn sender(&self) -> broadcast::Sender<BroadcastPayload> {
        self.tx.clone()
    }
}

impl Default for ChannelFanout {
    fn default() -> Self {
        Self::new()
    }
}

impl Fanout for ChannelFanout {
    fn broadcast(&self, payload: &BroadcastPayload) {
        // send returns Err only when there are zero receivers, which is
        // normal when no WebSocket clients are connected.
        let _ = self.tx.send(payload.clone());
    }
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
/// Generic over the [`HistoryReader`] so tests can serve history from
/// the in-memory store.
pub struct AppState<H> {
    /// Control surface over the running world.
    pub handle: WorldHandle,
    /// Broadcast sender for live-update messages.
    pub tx: broadcast::Sender<BroadcastPayload>,
    /// Read access to persisted history.
    pub history: Arc<H>,
}

impl<H> Clone for AppState<H> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            tx: self.tx.clone(),
            history: Arc::clone(&self.history),
        }
    }
}

impl<H: HistoryReader> AppState<H> {
    /// Build state over a world handle, the fanout's sender, and the
    /// history store.
    pub const fn new(
        handle: WorldHandle,
        tx: broadcast::Sender<BroadcastPayload>,
        history: Arc<H>,
    ) -> Self {
        Self {
            handle,
            tx,
            history,
        }
    }

    /// Subscribe to the live-update channel.
    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastPayload> {
        self.tx.subscribe()
    }

    /// Publish a payload to all connected clients.
    ///
    /// Returns the number of receivers that got the message; 0 when no
    /// clients are connected (not an error).
    pub fn publish(&self, payload: &BroadcastPayload) -> usize {
        self.tx.send(payload.clone()).unwrap_or(0)
    }
}

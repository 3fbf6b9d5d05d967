//! The observer fan-out collaborator.
//!
//! The scheduler pushes every recorded event and mood change through
//! this trait. Delivery is best-effort and synchronous from the
//! scheduler's point of view; an implementation with no listeners (or a
//! lagging listener) must never block or fail a tick.

use terrarium_types::BroadcastPayload;

/// Best-effort push channel toward observers.
pub trait Fanout: Send + Sync {
    /// Publish a payload. Implementations swallow delivery failures.
    fn broadcast(&self, payload: &BroadcastPayload);
}

/// Fan-out that drops everything. Used when no observer surface is
/// attached, and in tests that only care about persistence effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFanout;

impl Fanout for NoopFanout {
    fn broadcast(&self, _payload: &BroadcastPayload) {}
}

/// Fan-out that records payloads in memory, for tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingFanout {
    payloads: std::sync::Arc<std::sync::Mutex<Vec<BroadcastPayload>>>,
}

impl RecordingFanout {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything broadcast so far, in order.
    pub fn payloads(&self) -> Vec<BroadcastPayload> {
        self.payloads
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl Fanout for RecordingFanout {
    fn broadcast(&self, payload: &BroadcastPayload) {
        let mut guard = self
            .payloads
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.push(payload.clone());
    }
}

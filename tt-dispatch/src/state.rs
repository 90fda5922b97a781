//! Shared dispatcher state
//!
//! Event fan-out shared by the engine and the HTTP layer.

use tokio::sync::broadcast;
use tt_common::events::DispatchEvent;

/// Buffered events per subscriber before lagging receivers drop the oldest
const EVENT_BUFFER: usize = 100;

pub struct SharedState {
    /// Event broadcaster for SSE listeners
    pub event_tx: broadcast::Sender<DispatchEvent>,
}

impl SharedState {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_BUFFER);
        Self { event_tx }
    }

    /// Broadcast an event to all listeners
    pub fn broadcast_event(&self, event: DispatchEvent) {
        // No receivers is OK
        let _ = self.event_tx.send(event);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DispatchEvent> {
        self.event_tx.subscribe()
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

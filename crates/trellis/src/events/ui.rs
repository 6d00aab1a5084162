//! Typed UI events streamed to connected front-ends.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// An event for the message stream. The wire shape is
/// `{"type": "line"|"hydra", "content": …}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UiEvent {
    Line { content: String },
    Hydra { content: String },
}

/// Bounded fan-out sender. With no consumer attached, or with a consumer
/// that lags past the buffer, events are dropped oldest-first; emission
/// never blocks the interpreter.
#[derive(Clone)]
pub struct UiSender {
    tx: broadcast::Sender<UiEvent>,
}

impl UiSender {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn send(&self, event: UiEvent) {
        // Err means no subscriber right now; the event is simply dropped.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.tx.subscribe()
    }
}

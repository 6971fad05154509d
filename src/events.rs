//! Map event fan-out.
//!
//! Interested parties subscribe and receive [`MapEvent`]s over a channel;
//! publishing is fire-and-forget and never blocks the paint or fetch
//! paths. Replaces a listener-callback loop with a message channel.

use std::sync::{Arc, Mutex};

use crossbeam_channel::{unbounded, Receiver, Sender};

/// Events published by the map facade and the tile controller.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// The viewport was panned.
    Moved,
    /// The zoom level changed.
    ZoomChanged { old: u8, new: u8 },
    /// The active tile source was swapped.
    SourceChanged,
    /// Something changed off the paint path (typically a finished tile
    /// fetch); the owner should schedule a repaint.
    RedrawRequested,
}

/// Subscription registry delivering [`MapEvent`]s to any number of
/// receivers. Cloning shares the registry.
#[derive(Clone, Default)]
pub struct EventBus {
    senders: Arc<Mutex<Vec<Sender<MapEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> Receiver<MapEvent> {
        let (tx, rx) = unbounded();
        if let Ok(mut senders) = self.senders.lock() {
            senders.push(tx);
        }
        rx
    }

    /// Deliver `event` to every live subscriber, dropping channels whose
    /// receiver has gone away.
    pub fn publish(&self, event: MapEvent) {
        if let Ok(mut senders) = self.senders.lock() {
            senders.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.senders.lock().map(|s| s.len()).unwrap_or(0);
        f.debug_struct("EventBus").field("subscribers", &count).finish()
    }
}

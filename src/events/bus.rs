//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a wrapper around [`tokio::sync::broadcast`] that lets the
//! scheduler actor broadcast [`Event`]s to any number of subscribers.
//!
//! ## Key characteristics:
//! - **Broadcast semantics**: all active subscribers receive a clone of
//!   each event
//! - **Non-persistent**: events are lost if there are no active subscribers
//! - **Bounded capacity**: old events are dropped when the channel is full
//!
//! Step-skip notices and other advisory diagnostics travel through this
//! layer; the scheduler itself never blocks on delivery.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
#[derive(Clone)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity.
    ///
    /// When capacity is exceeded, the oldest unsent events are dropped for
    /// lagging receivers.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes an event to all active subscribers.
    ///
    /// If there are no active subscribers, the event is dropped silently;
    /// the scheduler operates the same with or without observers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe all events published after
    /// this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

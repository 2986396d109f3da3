//! # Non-blocking event fan-out to multiple subscribers.
//!
//! [`SubscriberSet`] distributes events to subscribers concurrently without
//! blocking the scheduler actor.
//!
//! ## Architecture
//! ```text
//! emit_arc(event)
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     └──► [queue N] ──► worker N ──► subscriberN.on_event()
//! ```
//!
//! ## Rules
//! - **No cross-subscriber ordering**: A may process event N while B is on
//!   N+5; each subscriber individually sees FIFO order
//! - **Overflow**: the event is dropped for that subscriber only and a
//!   `SubscriberOverflow` diagnostic is published
//! - **Isolation**: a slow or panicking subscriber doesn't affect others
//!
//! Diagnostics about the fan-out itself (`SubscriberOverflow`,
//! `SubscriberPanicked`) never generate further overflow diagnostics, so a
//! wedged subscriber cannot start an event storm.

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::error::panic_message;
use crate::events::{Bus, Event};
use crate::subscribers::Subscribe;

/// Per-subscriber channel metadata.
struct Channel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for event subscribers.
pub struct SubscriberSet {
    channels: Vec<Channel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Each subscriber gets a bounded queue (capacity from
    /// [`Subscribe::queue_capacity`], clamped to >= 1) and a dedicated
    /// worker that runs until the queue closes.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let name = sub.name();
            let (tx, rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
            workers.push(spawn_worker(sub, rx, bus.clone()));
            channels.push(Channel { name, sender: tx });
        }

        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Emits a pre-allocated `Arc<Event>` to all subscribers.
    ///
    /// Uses `try_send`: returns immediately, dropping the event (with an
    /// overflow diagnostic) for any subscriber whose queue is full or
    /// closed.
    pub fn emit_arc(&self, event: Arc<Event>) {
        let diagnostic = event.is_subscriber_diagnostic();

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !diagnostic {
                self.bus
                    .publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Emits an event to all subscribers (clones into an `Arc`).
    pub fn emit(&self, event: &Event) {
        self.emit_arc(Arc::new(event.clone()));
    }

    /// Gracefully shuts down all subscriber workers.
    ///
    /// Drops the channel senders (workers observe closure) and awaits each
    /// worker.
    pub async fn shutdown(self) {
        drop(self.channels);

        for h in self.workers {
            let _ = h.await;
        }
    }
}

/// Worker loop: drain the queue, isolate panics, report them to the bus.
fn spawn_worker(
    sub: Arc<dyn Subscribe>,
    mut rx: mpsc::Receiver<Arc<Event>>,
    bus: Bus,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(ev) = rx.recv().await {
            let fut = sub.on_event(ev.as_ref());
            if let Err(payload) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                bus.publish(Event::subscriber_panicked(
                    sub.name(),
                    panic_message(payload.as_ref()),
                ));
            }
        }
    })
}

//! # Event subscriber trait.
//!
//! Provides [`Subscribe`] — the extension point for plugging custom event
//! handlers (logging, metrics, audit) into the runtime.
//!
//! Each subscriber gets:
//! - **Dedicated worker task** (runs independently)
//! - **Bounded queue** (capacity via [`Subscribe::queue_capacity`])
//! - **Panic isolation** (panics caught, reported as `SubscriberPanicked`)
//!
//! ## Rules
//! - Slow subscribers only affect themselves (queue overflow → event drop)
//! - Panics do not crash the scheduler or other subscribers
//! - Subscribers never block the scheduler actor

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber for runtime observability.
///
/// Receives events from the scheduler via a dedicated worker task with a
/// bounded queue.
///
/// ### Implementation requirements
/// - Use async I/O; blocking stalls only this subscriber's queue
/// - Handle errors internally, do not panic
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event.
    ///
    /// Called from the dedicated worker task, in per-subscriber FIFO order.
    /// Panics are caught and reported as `SubscriberPanicked`.
    async fn on_event(&self, event: &Event);

    /// Returns the subscriber name used in overflow/panic diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the preferred queue capacity for this subscriber.
    ///
    /// When the queue is full, new events are dropped for this subscriber
    /// only and a `SubscriberOverflow` event is published.
    fn queue_capacity(&self) -> usize {
        1024
    }
}

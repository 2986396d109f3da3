//! Observability: typed lifecycle events and the broadcast bus.
//!
//! The scheduler actor publishes an [`Event`] for every observable
//! transition (queue, step, skip, crash, cleanup, interlock changes).
//! Subscribers consume them through the [`Bus`], directly or via the
//! fan-out in [`subscribers`](crate::subscribers).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};

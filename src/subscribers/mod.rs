//! Subscriber plumbing: the [`Subscribe`] extension point, the bounded
//! fan-out [`SubscriberSet`], and the demo [`LogWriter`] (feature
//! `logging`).

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;

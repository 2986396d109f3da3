//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for the scheduler runtime.
//!
//! ## Sentinel values
//! - `mailbox_capacity` and `bus_capacity` are clamped to a minimum of 1 by
//!   their accessors; a zero never reaches the underlying channels.
//! - RPC submissions queue with [`RPC_PAGE`] as their page address.

use std::time::Duration;

/// Page address used for RPC submissions, which are not bound to a page.
pub const RPC_PAGE: i64 = -1;

/// Global configuration for the scheduler runtime.
///
/// ## Field semantics
/// - `tick_period`: interval between scheduler ticks; one process steps per
///   tick at most
/// - `mailbox_capacity`: bound on queued requests to the request port; a
///   full mailbox is the transient busy signal on non-blocking paths
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped)
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to
/// avoid sprinkling sentinel checks across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Interval between scheduler ticks.
    ///
    /// Each tick selects at most one process, applies the interlock
    /// predicate, and steps it once. Lowering this increases instruction
    /// throughput and tick-loop overhead proportionally.
    pub tick_period: Duration,

    /// Capacity of the request mailbox feeding the scheduler actor.
    ///
    /// Requests queue in arrival order; a full mailbox rejects non-blocking
    /// submissions with a transient busy error.
    pub mailbox_capacity: usize,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages
    /// will receive `Lagged` and skip older items.
    pub bus_capacity: usize,
}

impl Config {
    /// Returns the interval between `await` polls of a live job.
    ///
    /// Two tick periods: one poll per scheduling opportunity, with slack for
    /// bookkeeping.
    #[inline]
    pub fn await_poll(&self) -> Duration {
        self.tick_period * 2
    }

    /// Returns a mailbox capacity clamped to a minimum of 1.
    #[inline]
    pub fn mailbox_capacity_clamped(&self) -> usize {
        self.mailbox_capacity.max(1)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    ///
    /// The `Bus` should use this value to avoid constructing an invalid
    /// channel.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `tick_period = 20ms` (50 instructions/second ceiling)
    /// - `mailbox_capacity = 64` (ample for interactive submitters)
    /// - `bus_capacity = 1024` (good baseline)
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(20),
            mailbox_capacity: 64,
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn await_poll_is_two_ticks() {
        let cfg = Config::default();
        assert_eq!(cfg.await_poll(), Duration::from_millis(40));
    }

    #[test]
    fn capacities_clamp_to_one() {
        let cfg = Config {
            mailbox_capacity: 0,
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.mailbox_capacity_clamped(), 1);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}

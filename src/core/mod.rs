//! Scheduling core: table, interlock, stepper, state, and the actor.
//!
//! The public API re-exported from here is [`Scheduler`] /
//! [`SchedulerHandle`] plus the [`JobId`] key and RPC response types.
//! Everything else is a building block the actor wires together.
//!
//! ## Files & responsibilities
//! - **table.rs**: circular process table — insertion-ordered map with a
//!   rotating cursor; monotone job ids, rotate-then-delete removal.
//! - **interlock.rs**: firmware ownership + emergency lock, and the
//!   16-entry admission truth table with its closed-form equivalent.
//! - **stepper.rs**: one interpreter step behind `catch_unwind`; every
//!   failure mode becomes a crashed process, never an error.
//! - **state.rs**: the synchronous transitions (queue, lookup-with-cleanup,
//!   lock/unlock, tick) over table + interlock.
//! - **scheduler.rs**: the actor loop (`select!` over interval ticks and
//!   the request mailbox), the submission API, and the callback guard.
//!
//! ## One tick, end to end
//! ```text
//! interval fires
//!   └─► SchedState::tick()
//!        ├─► current() — empty/gap → nothing
//!        ├─► terminal at cursor    → ProcSkipped(terminal), defer cleanup
//!        ├─► Interlock::admit()    → deny → ProcSkipped(interlock)
//!        ├─► firmware kind, no owner → claim + FirmwareClaimed
//!        ├─► execute_step()        → ProcStepped | ProcCrashed
//!        └─► rotate()
//! ```
//!
//! Cleanup happens on the lookup path, not in the tick: a terminal process
//! stays visible until a caller observes it, at which point it is removed
//! and any firmware claim it held is released.

pub mod interlock;
mod scheduler;
mod state;
mod stepper;
pub mod table;

pub use scheduler::{RpcCallback, RpcResponse, Scheduler, SchedulerHandle, SeqCallback};
pub use table::{CircularTable, JobId};

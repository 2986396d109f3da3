//! # Runtime events emitted by the scheduler.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Process lifecycle**: queued, stepped, skipped, crashed, removed
//! - **Interlock transitions**: firmware claimed/released, lock
//!   engaged/cleared
//! - **Callback guard**: a user completion callback panicked
//! - **Subscriber plumbing**: overflow and panic diagnostics
//!
//! The [`Event`] struct carries metadata such as the job id, process ref,
//! instruction kind, and error messages.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically, so events can be ordered correctly even when delivered
//! out-of-order through async channels.
//!
//! ## Event flow examples
//!
//! ### One permitted tick
//! ```text
//! [tick fires]
//!   → FirmwareClaimed      (first firmware step only)
//!   → ProcStepped | ProcCrashed
//! ```
//!
//! ### Terminal cleanup
//! ```text
//! lookup(id) observes Done/Crashed
//!   → FirmwareReleased     (when the process held the firmware)
//!   → ProcRemoved
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::ast::InstructionKind;
use crate::core::table::JobId;
use crate::proc::ProcRef;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    SubscriberPanicked,
    /// Subscriber dropped an event (queue full or worker closed).
    SubscriberOverflow,

    // === Callback guard ===
    /// A user completion callback panicked; the panic was swallowed.
    CallbackPanicked,

    // === Process lifecycle ===
    /// A process was inserted into the table.
    ProcQueued,
    /// The cursor process executed one instruction.
    ProcStepped,
    /// The cursor process was not stepped this tick (terminal at cursor,
    /// or interlock denial; see `reason`).
    ProcSkipped,
    /// A step failure was absorbed; the process is now crashed.
    ProcCrashed,
    /// A terminal process was observed by lookup and removed.
    ProcRemoved,

    // === Interlock transitions ===
    /// A process acquired exclusive firmware ownership.
    FirmwareClaimed,
    /// Firmware ownership was released at cleanup.
    FirmwareReleased,
    /// The global emergency lock was engaged.
    LockEngaged,
    /// The global emergency lock was cleared.
    LockCleared,
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp (may go backwards, use for logging only).
    pub at: SystemTime,
    /// The kind of event.
    pub kind: EventKind,
    /// Job id, if the event concerns a table entry.
    pub job: Option<JobId>,
    /// Process identity, if applicable.
    pub proc_ref: Option<ProcRef>,
    /// Instruction kind at the relevant program counter.
    pub instruction: Option<InstructionKind>,
    /// Error message, if the event represents a failure.
    pub error: Option<String>,
    /// Short machine-readable cause (e.g. skip reasons).
    pub reason: Option<&'static str>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            job: None,
            proc_ref: None,
            instruction: None,
            error: None,
            reason: None,
        }
    }

    /// Attaches a job id.
    pub fn with_job(mut self, id: JobId) -> Self {
        self.job = Some(id);
        self
    }

    /// Attaches a process identity.
    pub fn with_proc(mut self, proc_ref: ProcRef) -> Self {
        self.proc_ref = Some(proc_ref);
        self
    }

    /// Attaches an instruction kind.
    pub fn with_instruction(mut self, kind: InstructionKind) -> Self {
        self.instruction = Some(kind);
        self
    }

    /// Attaches an error message.
    pub fn with_error(mut self, msg: impl Into<String>) -> Self {
        self.error = Some(msg.into());
        self
    }

    /// Attaches a machine-readable cause.
    pub fn with_reason(mut self, reason: &'static str) -> Self {
        self.reason = Some(reason);
        self
    }

    /// Creates a subscriber overflow event.
    ///
    /// Emitted when a subscriber's queue is full and an event is dropped.
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::now(EventKind::SubscriberOverflow)
            .with_reason(reason)
            .with_error(format!("subscriber={subscriber}"))
    }

    /// Creates a subscriber panic event.
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::now(EventKind::SubscriberPanicked)
            .with_error(format!("subscriber={subscriber} panic={info}"))
    }

    /// Creates a callback panic event.
    pub fn callback_panicked(info: String) -> Self {
        Event::now(EventKind::CallbackPanicked).with_error(info)
    }

    /// True for events emitted by the subscriber plumbing itself.
    ///
    /// The fan-out layer checks this to avoid publishing overflow
    /// diagnostics about its own diagnostics.
    pub fn is_subscriber_diagnostic(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

//! # Farm processes: independently executing sequence programs.
//!
//! A [`FarmProc`] is one submitted program mid-execution: a sliced
//! [`Heap`], a program counter into it, a lifecycle [`ProcStatus`], and the
//! bound I/O callback the interpreter uses for effects.
//!
//! The scheduler treats processes as near-opaque. It observes `status` and
//! `pc_kind`, steps them through the interpreter, and never mutates
//! anything but status and crash reason (when absorbing a step failure).
//!
//! [`ProcRef`] is the identity the interlock tracks: unique across every
//! process ever created in this runtime, stable for the process lifetime,
//! and never reused. Job ids name table entries; refs name the processes
//! themselves.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::ast::{Address, Heap, InstructionKind};
use crate::interp::IoLayer;

/// Global counter backing [`ProcRef`] allocation.
static NEXT_REF: AtomicU64 = AtomicU64::new(0);

/// Page address a process was submitted under. RPC submissions use the
/// [`RPC_PAGE`](crate::RPC_PAGE) sentinel.
pub type PageAddr = i64;

/// Stable identity of a farm process, unique across the runtime's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProcRef(u64);

impl ProcRef {
    fn next() -> Self {
        ProcRef(NEXT_REF.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

impl fmt::Display for ProcRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proc-{}", self.0)
    }
}

/// Lifecycle state of a farm process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcStatus {
    /// Live; eligible to step.
    Ok,
    /// Live; the interpreter is waiting on an effect. Steps like `Ok`;
    /// the interpreter decides when the wait is over.
    Waiting,
    /// Terminal; the program ran to completion.
    Done,
    /// Terminal; a step failed and was absorbed.
    Crashed,
}

impl ProcStatus {
    /// True for `Done` and `Crashed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcStatus::Done | ProcStatus::Crashed)
    }

    /// Returns a short stable label for logs/metrics.
    pub fn as_label(self) -> &'static str {
        match self {
            ProcStatus::Ok => "ok",
            ProcStatus::Waiting => "waiting",
            ProcStatus::Done => "done",
            ProcStatus::Crashed => "crashed",
        }
    }
}

/// One submitted program mid-execution.
#[derive(Clone)]
pub struct FarmProc {
    status: ProcStatus,
    proc_ref: ProcRef,
    crash_reason: Option<String>,
    pc: Address,
    page: PageAddr,
    heap: Heap,
    io: IoLayer,
}

impl FarmProc {
    /// Creates a live process over `heap`, bound to `io`, with the program
    /// counter at the root.
    pub fn new(io: IoLayer, page: PageAddr, heap: Heap) -> Self {
        Self {
            status: ProcStatus::Ok,
            proc_ref: ProcRef::next(),
            crash_reason: None,
            pc: 0,
            page,
            heap,
            io,
        }
    }

    /// Current lifecycle status.
    pub fn status(&self) -> ProcStatus {
        self.status
    }

    /// Replaces the lifecycle status.
    pub fn set_status(&mut self, status: ProcStatus) {
        self.status = status;
    }

    /// Stable identity of this process.
    pub fn proc_ref(&self) -> ProcRef {
        self.proc_ref
    }

    /// Crash message; present only when status is `Crashed`.
    pub fn crash_reason(&self) -> Option<&str> {
        self.crash_reason.as_deref()
    }

    /// Records the crash message.
    pub fn set_crash_reason(&mut self, reason: impl Into<String>) {
        self.crash_reason = Some(reason.into());
    }

    /// Instruction kind at the current program counter.
    ///
    /// The scheduler's interlock predicate keys off this.
    pub fn pc_kind(&self) -> InstructionKind {
        self.heap.kind_at(self.pc)
    }

    /// Current program counter.
    pub fn pc(&self) -> Address {
        self.pc
    }

    /// Moves the program counter. Interpreter use.
    pub fn set_pc(&mut self, pc: Address) {
        self.pc = pc;
    }

    /// Page address this process was submitted under.
    pub fn page(&self) -> PageAddr {
        self.page
    }

    /// The sliced program.
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// The bound effect callback. Interpreter use.
    pub fn io_layer(&self) -> &IoLayer {
        &self.io
    }
}

impl fmt::Debug for FarmProc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FarmProc")
            .field("status", &self.status)
            .field("proc_ref", &self.proc_ref)
            .field("crash_reason", &self.crash_reason)
            .field("pc", &self.pc)
            .field("page", &self.page)
            .field("heap_len", &self.heap.len())
            .finish_non_exhaustive()
    }
}

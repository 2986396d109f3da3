//! # Scheduler state: process table + interlock transitions.
//!
//! [`SchedState`] owns the circular process table and the [`Interlock`] and
//! implements every state transition the request port and tick loop need.
//! It is purely synchronous; the scheduler actor is its only caller, which
//! is what serializes all mutation.
//!
//! ## Tick shape
//! ```text
//! tick()
//!   ├─► current() is None            → nothing to do
//!   ├─► current is Done/Crashed      → skip (cleanup belongs to lookup)
//!   ├─► interlock denies             → skip
//!   ├─► firmware kind, no owner      → claim for current, then step
//!   ├─► otherwise                    → step
//!   └─► rotate()
//! ```
//!
//! ## Rules
//! - At most one process steps per tick
//! - Terminal entries stay in the table until a lookup observes them
//! - Firmware ownership is released only at that cleanup, never on
//!   `Waiting`

use crate::ast::Heap;
use crate::core::interlock::Interlock;
use crate::core::stepper::execute_step;
use crate::core::table::{CircularTable, JobId};
use crate::events::{Bus, Event, EventKind};
use crate::interp::{HyperLayer, HyperSignal, Interpreter, IoLayer};
use crate::proc::{FarmProc, PageAddr, ProcStatus};

/// Table, interlock, and the callbacks the transitions invoke.
pub(crate) struct SchedState {
    table: CircularTable<FarmProc>,
    interlock: Interlock,
    io: IoLayer,
    hyper: HyperLayer,
    bus: Bus,
}

impl SchedState {
    pub fn new(io: IoLayer, hyper: HyperLayer, bus: Bus) -> Self {
        Self {
            table: CircularTable::new(),
            interlock: Interlock::new(),
            io,
            hyper,
            bus,
        }
    }

    /// Constructs a process over `heap` bound to the I/O callback and
    /// inserts it.
    pub fn queue(&mut self, heap: Heap, page: PageAddr) -> JobId {
        let proc = FarmProc::new(self.io.clone(), page, heap);
        let proc_ref = proc.proc_ref();
        let id = self.table.push(proc);
        self.bus
            .publish(Event::now(EventKind::ProcQueued).with_job(id).with_proc(proc_ref));
        id
    }

    /// Reads the entry under `id`.
    ///
    /// A terminal entry is removed on observation; if it held the firmware,
    /// ownership is released. The (final) process is returned in every case
    /// where the id existed.
    pub fn lookup(&mut self, id: JobId) -> Option<FarmProc> {
        let proc = self.table.at(id)?.clone();
        if proc.status().is_terminal() {
            self.table.remove(id);
            if self.interlock.fw_proc() == Some(proc.proc_ref()) {
                self.interlock.release();
                self.bus
                    .publish(Event::now(EventKind::FirmwareReleased).with_proc(proc.proc_ref()));
            }
            self.bus
                .publish(Event::now(EventKind::ProcRemoved).with_job(id).with_proc(proc.proc_ref()));
        }
        Some(proc)
    }

    /// Hyper path: signal the hyper callback, then engage the lock.
    pub fn emergency_lock(&mut self) {
        (self.hyper)(HyperSignal::EmergencyLock);
        self.interlock.engage();
        self.bus.publish(Event::now(EventKind::LockEngaged));
    }

    /// Hyper path: signal the hyper callback, then clear the lock.
    pub fn emergency_unlock(&mut self) {
        (self.hyper)(HyperSignal::EmergencyUnlock);
        self.interlock.clear();
        self.bus.publish(Event::now(EventKind::LockCleared));
    }

    /// Ids of all table entries, ascending.
    pub fn jobs(&self) -> Vec<JobId> {
        self.table.reduce(Vec::new(), |mut acc, id, _| {
            acc.push(id);
            acc
        })
    }

    /// One scheduler tick: select, admit, step, rotate.
    pub fn tick(&mut self, interp: &dyn Interpreter) {
        self.select_and_step(interp);
        self.table.rotate();
    }

    fn select_and_step(&mut self, interp: &dyn Interpreter) {
        let Some(current) = self.table.current() else {
            return;
        };
        let job = self.table.cursor();
        let proc_ref = current.proc_ref();
        let kind = current.pc_kind();

        if current.status().is_terminal() {
            self.bus.publish(
                Event::now(EventKind::ProcSkipped)
                    .with_job(job)
                    .with_reason("terminal"),
            );
            return;
        }
        if !self.interlock.admit(kind, proc_ref) {
            self.bus.publish(
                Event::now(EventKind::ProcSkipped)
                    .with_job(job)
                    .with_instruction(kind)
                    .with_reason("interlock"),
            );
            return;
        }
        // Ownership commits atomically with the step itself: both happen
        // inside this tick, before any other request is observed.
        if kind.needs_firmware() && self.interlock.fw_proc().is_none() {
            self.interlock.claim(proc_ref);
            self.bus
                .publish(Event::now(EventKind::FirmwareClaimed).with_job(job).with_proc(proc_ref));
        }

        self.table.update_current(|p| execute_step(interp, p));

        match self.table.current() {
            Some(p) if p.status() == ProcStatus::Crashed => {
                let ev = Event::now(EventKind::ProcCrashed)
                    .with_job(job)
                    .with_proc(proc_ref)
                    .with_instruction(kind);
                let ev = match p.crash_reason() {
                    Some(reason) => ev.with_error(reason),
                    None => ev,
                };
                self.bus.publish(ev);
            }
            _ => {
                self.bus.publish(
                    Event::now(EventKind::ProcStepped)
                        .with_job(job)
                        .with_proc(proc_ref)
                        .with_instruction(kind),
                );
            }
        }
    }

    #[cfg(test)]
    pub fn interlock(&self) -> &Interlock {
        &self.interlock
    }
}

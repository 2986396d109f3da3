//! # Firmware ownership, emergency lock, and the step-admission predicate.
//!
//! [`Interlock`] is the safety record the tick loop consults before letting
//! a process execute: who (if anyone) owns the firmware device, and whether
//! the system is emergency-locked.
//!
//! Admission is a pure function of four booleans, MSB→LSB:
//!
//! - `b3` — the instruction kind is allowed while emergency-locked
//! - `b2` — the instruction kind needs exclusive firmware access
//! - `b1` — this process owns the firmware, or no process does
//! - `b0` — the system is emergency-locked
//!
//! [`permit`] encodes the policy as the full 16-entry truth table; it is the
//! authoritative form. [`permit_expr`] is the equivalent closed expression
//! `(!b0 || b3) && (!b2 || b1)`; the test suite holds them bit-exact against
//! each other.
//!
//! Readings of the table:
//! 1. locked and the kind is not allowed-while-locked → deny
//! 2. the kind needs firmware and another process owns it → deny
//! 3. otherwise → permit
//!
//! ## Rules
//! - Ownership is a tag, not a lock: acquired when the tick loop commits a
//!   permitted firmware step under no owner, released only when the owning
//!   process is cleaned up after reaching a terminal state. A `Waiting`
//!   process keeps its claim.
//! - Engaging the emergency lock is idempotent; clearing it does not alter
//!   firmware ownership.

use crate::ast::InstructionKind;
use crate::proc::ProcRef;

/// The authoritative 16-entry admission table.
///
/// Bit order is `(b3, b2, b1, b0)` as documented at module level.
pub fn permit(b3: bool, b2: bool, b1: bool, b0: bool) -> bool {
    match (b3, b2, b1, b0) {
        (false, false, false, false) => true,
        (false, false, false, true) => false,
        (false, false, true, false) => true,
        (false, false, true, true) => false,
        (false, true, false, false) => false,
        (false, true, false, true) => false,
        (false, true, true, false) => true,
        (false, true, true, true) => false,
        (true, false, false, false) => true,
        (true, false, false, true) => true,
        (true, false, true, false) => true,
        (true, false, true, true) => true,
        (true, true, false, false) => false,
        (true, true, false, true) => false,
        (true, true, true, false) => true,
        (true, true, true, true) => true,
    }
}

/// Closed-form equivalent of [`permit`]: `(!b0 || b3) && (!b2 || b1)`.
pub fn permit_expr(b3: bool, b2: bool, b1: bool, b0: bool) -> bool {
    (!b0 || b3) && (!b2 || b1)
}

/// Firmware ownership plus the global emergency-lock flag.
#[derive(Clone, Debug, Default)]
pub struct Interlock {
    fw_proc: Option<ProcRef>,
    locked: bool,
}

impl Interlock {
    /// Unlocked, unowned state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity of the current firmware owner, if any.
    pub fn fw_proc(&self) -> Option<ProcRef> {
        self.fw_proc
    }

    /// True while emergency-locked.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Engages the emergency lock. Idempotent.
    pub fn engage(&mut self) {
        self.locked = true;
    }

    /// Clears the emergency lock. Firmware ownership is untouched.
    pub fn clear(&mut self) {
        self.locked = false;
    }

    /// Records `proc_ref` as the firmware owner.
    pub fn claim(&mut self, proc_ref: ProcRef) {
        self.fw_proc = Some(proc_ref);
    }

    /// Drops firmware ownership.
    pub fn release(&mut self) {
        self.fw_proc = None;
    }

    /// Applies the admission table for `proc_ref` attempting `kind`.
    pub fn admit(&self, kind: InstructionKind, proc_ref: ProcRef) -> bool {
        let b3 = kind.allowed_when_locked();
        let b2 = kind.needs_firmware();
        let b1 = self.fw_proc.map_or(true, |owner| owner == proc_ref);
        let b0 = self.locked;
        permit(b3, b2, b1, b0)
    }
}

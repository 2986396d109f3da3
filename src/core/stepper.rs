//! # Step executor: one interpreter step with failure absorption.
//!
//! [`execute_step`] is the only call site of [`Interpreter::step`]. Whatever
//! happens inside the interpreter (a clean step, a dedicated fault carrying
//! partial progress, an arbitrary error, a panic), the executor returns a
//! process, never an error. A misbehaving sequence must not take down the
//! scheduler or its neighbors.
//!
//! ## Outcomes
//! ```text
//! step(p) → Ok(p')                → p'
//! step(p) → Err(Interp{proc, _})  → carried proc, unchanged
//! step(p) → Err(Fault{message})   → p with status=Crashed, reason=message
//! step(p) → panic                 → p with status=Crashed, reason=panic msg
//! ```

use std::panic::{self, AssertUnwindSafe};

use crate::error::panic_message;
use crate::interp::{Interpreter, StepFault};
use crate::proc::{FarmProc, ProcStatus};

/// Runs one interpreter step over `proc`, absorbing every failure mode.
pub(crate) fn execute_step(interp: &dyn Interpreter, proc: FarmProc) -> FarmProc {
    let fallback = proc.clone();

    match panic::catch_unwind(AssertUnwindSafe(|| interp.step(proc))) {
        Ok(Ok(next)) => next,
        Ok(Err(StepFault::Interp { proc, .. })) => *proc,
        Ok(Err(StepFault::Fault { message })) => crashed(fallback, message),
        Err(payload) => crashed(fallback, panic_message(payload.as_ref())),
    }
}

fn crashed(mut proc: FarmProc, reason: String) -> FarmProc {
    proc.set_status(ProcStatus::Crashed);
    proc.set_crash_reason(reason);
    proc
}

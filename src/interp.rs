//! # External collaborator contracts: interpreter and I/O layers.
//!
//! The scheduler never decodes or executes instructions itself. It drives an
//! [`Interpreter`] one step at a time and routes effects through two opaque
//! callbacks:
//!
//! - [`IoLayer`]: invoked by the interpreter during a step to perform an
//!   instruction's side effect (pin writes, movement, messaging).
//! - [`HyperLayer`]: invoked synchronously by the supervisor for out-of-band
//!   [`HyperSignal`] commands, bypassing scheduling.
//!
//! ## Rules
//! - `step` runs synchronously on the tick runner; a long-running
//!   implementation degrades the tick cadence for every process.
//! - Both callbacks are invoked from the supervisor runner and must be
//!   reentrancy-safe.
//! - A `step` failure never reaches the scheduler raw: the step executor
//!   converts it into a crashed process.

use std::sync::Arc;

use thiserror::Error;

use crate::ast::Ast;
use crate::proc::FarmProc;

/// Out-of-band command delivered on the hyper path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HyperSignal {
    /// Engage the global emergency lock.
    EmergencyLock,
    /// Clear the global emergency lock.
    EmergencyUnlock,
}

impl HyperSignal {
    /// Returns a short stable label for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HyperSignal::EmergencyLock => "emergency_lock",
            HyperSignal::EmergencyUnlock => "emergency_unlock",
        }
    }
}

/// Effect callback invoked by the interpreter while stepping a process.
///
/// Receives the AST form of the instruction being executed; returns its
/// result value, or a message describing why the effect failed.
pub type IoLayer = Arc<dyn Fn(&Ast) -> Result<serde_json::Value, String> + Send + Sync>;

/// Callback invoked synchronously from the supervisor for hyper commands.
pub type HyperLayer = Arc<dyn Fn(HyperSignal) + Send + Sync>;

/// Failure reported by [`Interpreter::step`].
#[derive(Error, Debug)]
pub enum StepFault {
    /// The interpreter's dedicated fault, carrying the partially advanced
    /// process. The scheduler keeps the carried process as-is; its status
    /// may be live or terminal depending on the interpreter.
    #[error("interpreter fault: {message}")]
    Interp {
        /// Partial progress to resume from.
        proc: Box<FarmProc>,
        /// Interpreter diagnostic.
        message: String,
    },

    /// Any other failure. The step executor marks the process crashed with
    /// this message as the crash reason.
    #[error("step failed: {message}")]
    Fault {
        /// What went wrong.
        message: String,
    },
}

/// The instruction-level interpreter.
///
/// Implementations own all instruction semantics: advancing the program
/// counter, evaluating arguments, invoking the process's
/// [`IoLayer`](crate::IoLayer), and setting
/// [`ProcStatus`](crate::ProcStatus) (`Waiting` for in-progress effects,
/// `Done` at program end).
///
/// ## Rules
/// - `step` consumes the process and returns the advanced one.
/// - Report recoverable trouble as [`StepFault::Interp`] with the carried
///   process; anything else as [`StepFault::Fault`].
/// - Panics are tolerated (the step executor catches them) but treated as
///   crashes of the stepped process.
pub trait Interpreter: Send + Sync + 'static {
    /// Executes the single instruction at the process's program counter.
    fn step(&self, proc: FarmProc) -> Result<FarmProc, StepFault>;
}

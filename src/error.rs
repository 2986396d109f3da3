//! # Error types used by the scheduler runtime.
//!
//! [`VmError`] covers everything the supervisor surfaces to submitters:
//! transient busy signals, unknown job ids, malformed submissions, and a
//! closed scheduler.
//!
//! Failures *inside* a farm process never appear here. The step executor
//! absorbs them and they manifest as a process with
//! [`ProcStatus::Crashed`](crate::ProcStatus::Crashed) and a crash reason.
//!
//! Variants provide `as_label()` for logs/metrics and `is_transient()` to
//! identify signals callers should retry.

use std::any::Any;

use thiserror::Error;

use crate::core::table::JobId;

/// # Errors surfaced by the scheduler to submitters.
///
/// These represent failures of the submission protocol itself, never of the
/// sequences being executed.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum VmError {
    /// The request port could not accept the request right now.
    ///
    /// Transient: the busy window is bounded by one step's duration plus
    /// bookkeeping. Callers retry without backoff.
    #[error("scheduler busy, retry")]
    Busy,

    /// No process with this job id exists (never created, or already
    /// cleaned up after a terminal observation).
    #[error("job {id} not found")]
    NotFound {
        /// The missing job id.
        id: JobId,
    },

    /// The submission was structurally valid but violated an argument
    /// contract (e.g. an RPC without a `label`).
    #[error("bad argument: {reason}")]
    BadArgument {
        /// What contract was violated.
        reason: String,
    },

    /// The submitted program could not be decoded into an AST.
    #[error("bad program: {reason}")]
    BadProgram {
        /// Decoder diagnostic.
        reason: String,
    },

    /// `run` was called on a scheduler whose actor loop is already running.
    #[error("scheduler already running")]
    AlreadyRunning,

    /// The scheduler actor is gone; no further requests can be served.
    #[error("scheduler closed")]
    Closed,
}

impl VmError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            VmError::Busy => "vm_busy",
            VmError::NotFound { .. } => "vm_not_found",
            VmError::BadArgument { .. } => "vm_bad_argument",
            VmError::BadProgram { .. } => "vm_bad_program",
            VmError::AlreadyRunning => "vm_already_running",
            VmError::Closed => "vm_closed",
        }
    }

    /// Indicates whether the caller should retry the request as-is.
    pub fn is_transient(&self) -> bool {
        matches!(self, VmError::Busy)
    }
}

/// Best-effort extraction of a human-readable message from a panic payload.
///
/// Used wherever the runtime isolates foreign code: the step executor, the
/// user-callback guard, and subscriber workers.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(VmError::Busy.as_label(), "vm_busy");
        assert_eq!(
            VmError::NotFound { id: JobId::new(7) }.as_label(),
            "vm_not_found"
        );
        assert_eq!(VmError::Closed.as_label(), "vm_closed");
    }

    #[test]
    fn only_busy_is_transient() {
        assert!(VmError::Busy.is_transient());
        assert!(!VmError::Closed.is_transient());
        assert!(!VmError::NotFound { id: JobId::new(0) }.is_transient());
    }

    #[test]
    fn panic_payloads_downcast() {
        let boxed: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(boxed.as_ref()), "static str");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");

        let boxed: Box<dyn Any + Send> = Box::new(42_u32);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}

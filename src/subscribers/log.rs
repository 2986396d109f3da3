//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//!
//! ## Output format
//! ```text
//! [queued] job=0 proc=proc-4
//! [stepped] job=0 instruction=move_absolute
//! [skipped] job=1 reason=interlock
//! [crashed] job=0 err="divide by zero"
//! [removed] job=0
//! [fw-claimed] proc=proc-4
//! [estop-engaged]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature. Not intended for production use —
/// implement a custom [`Subscribe`] for structured logging or metrics.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::ProcQueued => {
                if let (Some(job), Some(proc)) = (e.job, e.proc_ref) {
                    println!("[queued] job={job} proc={proc}");
                }
            }
            EventKind::ProcStepped => {
                println!("[stepped] job={:?} instruction={:?}", e.job, e.instruction);
            }
            EventKind::ProcSkipped => {
                println!("[skipped] job={:?} reason={:?}", e.job, e.reason);
            }
            EventKind::ProcCrashed => {
                println!("[crashed] job={:?} err={:?}", e.job, e.error);
            }
            EventKind::ProcRemoved => {
                println!("[removed] job={:?}", e.job);
            }
            EventKind::FirmwareClaimed => {
                println!("[fw-claimed] proc={:?}", e.proc_ref);
            }
            EventKind::FirmwareReleased => {
                println!("[fw-released] proc={:?}", e.proc_ref);
            }
            EventKind::LockEngaged => {
                println!("[estop-engaged]");
            }
            EventKind::LockCleared => {
                println!("[estop-cleared]");
            }
            EventKind::CallbackPanicked => {
                println!("[callback-panicked] err={:?}", e.error);
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                println!("[subscriber-diagnostic] err={:?}", e.error);
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}

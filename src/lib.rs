//! # farmvisor
//!
//! **Farmvisor** is the cooperative scheduler and interlock core of a
//! virtual machine executing farm-automation sequences for an agricultural
//! control robot.
//!
//! Multiple independent sequence programs ("farm processes") run
//! interleaved: a single actor advances them one instruction per tick in
//! round-robin order, subject to two safety interlocks. Exclusive
//! ownership of the physical firmware device gates firmware-touching
//! instructions, and a global emergency-lock state restricts execution to
//! a fixed set of instruction kinds.
//!
//! ## Features
//!
//! | Area              | Description                                                        | Key types / traits                         |
//! |-------------------|--------------------------------------------------------------------|--------------------------------------------|
//! | **Scheduling**    | Round-robin tick loop over a circular process table.               | [`Scheduler`], [`SchedulerHandle`]         |
//! | **Interlocks**    | Firmware exclusivity and emergency lock, one admission predicate.  | [`interlock`]                              |
//! | **Submission**    | Synchronous RPCs, asynchronous sequences, await-polling.           | [`RpcResponse`], [`JobId`]                 |
//! | **Programs**      | JSON-decoded ASTs sliced into addressed heaps.                     | [`Ast`], [`Heap`], [`InstructionKind`]     |
//! | **Processes**     | Opaque stepping via an external interpreter, crash absorption.     | [`FarmProc`], [`Interpreter`], [`StepFault`] |
//! | **Observability** | Typed lifecycle events, bounded fan-out to subscribers.            | [`Event`], [`Subscribe`]                   |
//! | **Errors**        | Typed submission errors; step failures become crashed processes.   | [`VmError`]                                |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] subscriber
//!   _(demo/reference only)_.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tokio_util::sync::CancellationToken;
//! use farmvisor::{
//!     Config, FarmProc, Interpreter, ProcStatus, Scheduler, StepFault,
//! };
//!
//! // The instruction-level interpreter is an external collaborator; this
//! // one finishes every program on its first step.
//! struct OneShot;
//!
//! impl Interpreter for OneShot {
//!     fn step(&self, mut proc: FarmProc) -> Result<FarmProc, StepFault> {
//!         proc.set_status(ProcStatus::Done);
//!         Ok(proc)
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scheduler = Scheduler::new(
//!         Config::default(),
//!         Arc::new(OneShot),
//!         Arc::new(|_ast| Ok(serde_json::Value::Null)),
//!         Arc::new(|signal| println!("hyper: {signal:?}")),
//!         Vec::new(),
//!     );
//!     let handle = scheduler.handle();
//!     scheduler.run(CancellationToken::new());
//!
//!     let program = serde_json::json!({
//!         "kind": "rpc_request",
//!         "args": {"label": "water plot 3"},
//!         "body": [{"kind": "write_pin", "args": {"pin": 8, "value": 1}}]
//!     });
//!     handle.rpc_request(program, Box::new(|response| {
//!         println!("rpc finished: {response:?}");
//!     })).await?;
//!     Ok(())
//! }
//! ```
//!
//! ---

mod ast;
mod config;
mod core;
mod error;
mod events;
mod interp;
mod proc;
mod subscribers;

// ---- Public re-exports ----

pub use ast::{Address, Ast, Cell, Heap, InstructionKind};
pub use config::{Config, RPC_PAGE};
pub use crate::core::interlock;
pub use crate::core::{
    CircularTable, JobId, RpcCallback, RpcResponse, Scheduler, SchedulerHandle, SeqCallback,
};
pub use error::VmError;
pub use events::{Bus, Event, EventKind};
pub use interp::{HyperLayer, HyperSignal, Interpreter, IoLayer, StepFault};
pub use proc::{FarmProc, PageAddr, ProcRef, ProcStatus};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logging subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;

//! # Scheduler: the supervisor actor and its request port.
//!
//! The [`Scheduler`] owns the runtime components (event bus, subscriber
//! fan-out, interpreter, I/O callbacks) and runs a single actor task that
//! owns all mutable scheduling state. Callers talk to it through a
//! [`SchedulerHandle`].
//!
//! ## Architecture
//! ```text
//! SchedulerHandle ──► mpsc mailbox ──► actor loop ──► SchedState
//!   queue/lookup          │                │            ├─ CircularTable
//!   emergency_*           │   tokio::select!            └─ Interlock
//!   await_job             │        │
//!   rpc_request           │        └──► interval tick ──► one step/tick
//!   sequence              │
//!                         └──► oneshot replies
//! ```
//!
//! ## Rules
//! - Requests are totally ordered: the actor commits one request (or one
//!   whole tick) before observing the next. A tick in progress delays
//!   queue/lookup traffic and never interleaves with it.
//! - The non-blocking submission path reports a full mailbox as
//!   [`VmError::Busy`]; callers retry without backoff.
//!   [`SchedulerHandle::await_job`] does this internally.
//! - Emergency lock/unlock bypass the process table entirely; they never
//!   create a job.
//! - Completion callbacks run behind a catch-all guard. A panicking
//!   callback is reported as a `CallbackPanicked` event and swallowed.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::ast::{Ast, Heap};
use crate::config::{Config, RPC_PAGE};
use crate::core::state::SchedState;
use crate::core::table::JobId;
use crate::error::{panic_message, VmError};
use crate::events::{Bus, Event};
use crate::interp::{HyperLayer, HyperSignal, Interpreter, IoLayer};
use crate::proc::{FarmProc, PageAddr, ProcStatus};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Outcome of a synchronous RPC submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RpcResponse {
    /// The RPC completed.
    Ok {
        /// The submission's `label` argument, echoed back.
        label: String,
    },
    /// The RPC's process crashed.
    Error {
        /// The submission's `label` argument, echoed back.
        label: String,
        /// The crash reason.
        message: String,
    },
}

/// Completion callback for [`SchedulerHandle::rpc_request`].
pub type RpcCallback = Box<dyn FnOnce(RpcResponse) + Send + 'static>;

/// Completion callback for [`SchedulerHandle::sequence`].
pub type SeqCallback = Box<dyn FnOnce(Result<(), String>) + Send + 'static>;

/// One request to the serialized port.
enum Request {
    Queue {
        heap: Heap,
        page: PageAddr,
        reply: oneshot::Sender<JobId>,
    },
    Lookup {
        id: JobId,
        reply: oneshot::Sender<Option<FarmProc>>,
    },
    EmergencyLock {
        reply: oneshot::Sender<()>,
    },
    EmergencyUnlock {
        reply: oneshot::Sender<()>,
    },
    Jobs {
        reply: oneshot::Sender<Vec<JobId>>,
    },
}

/// Supervisor for farm processes: owns the actor loop and its wiring.
pub struct Scheduler {
    cfg: Config,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    interp: Arc<dyn Interpreter>,
    io: IoLayer,
    hyper: HyperLayer,
    tx: mpsc::Sender<Request>,
    rx: RwLock<Option<mpsc::Receiver<Request>>>,
}

impl Scheduler {
    /// Creates a new scheduler (call [`run`](Self::run) to start it).
    pub fn new(
        cfg: Config,
        interp: Arc<dyn Interpreter>,
        io: IoLayer,
        hyper: HyperLayer,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Arc<Self> {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(subscribers, bus.clone()));
        let (tx, rx) = mpsc::channel(cfg.mailbox_capacity_clamped());

        Arc::new(Self {
            cfg,
            bus,
            subs,
            interp,
            io,
            hyper,
            tx,
            rx: RwLock::new(Some(rx)),
        })
    }

    /// Returns a handle for submitting work.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            tx: self.tx.clone(),
            bus: self.bus.clone(),
            await_poll: self.cfg.await_poll(),
        }
    }

    /// Returns a receiver observing all events published after this call.
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Starts the actor loop (spawns in background).
    ///
    /// The loop exits when `token` is cancelled or every handle is dropped.
    pub fn run(self: Arc<Self>, token: CancellationToken) {
        tokio::spawn(async move {
            if let Err(e) = self.run_inner(token).await {
                eprintln!("[scheduler] error: {e}");
            }
        });
    }

    async fn run_inner(&self, token: CancellationToken) -> Result<(), VmError> {
        let mut rx = self
            .rx
            .write()
            .await
            .take()
            .ok_or(VmError::AlreadyRunning)?;
        self.subscriber_listener(&token);

        let mut state = SchedState::new(self.io.clone(), self.hyper.clone(), self.bus.clone());
        // First tick one full period out, and a slow step delays later
        // ticks instead of stacking them up.
        let start = time::Instant::now() + self.cfg.tick_period;
        let mut tick = time::interval_at(start, self.cfg.tick_period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tick.tick() => state.tick(self.interp.as_ref()),
                req = rx.recv() => match req {
                    Some(req) => handle_request(&mut state, req),
                    None => break,
                },
            }
        }
        Ok(())
    }

    /// Forwards bus events to the subscriber fan-out.
    fn subscriber_listener(&self, token: &CancellationToken) {
        let mut rx = self.bus.subscribe();
        let subs = Arc::clone(&self.subs);
        let token = token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    res = rx.recv() => match res {
                        Ok(ev) => subs.emit_arc(Arc::new(ev)),
                        Err(broadcast::error::RecvError::Closed) => break,
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    }
                }
            }
        });
    }
}

/// Commits one request against the state. Replies best-effort: a caller
/// that gave up on the oneshot does not disturb the actor.
fn handle_request(state: &mut SchedState, req: Request) {
    match req {
        Request::Queue { heap, page, reply } => {
            let _ = reply.send(state.queue(heap, page));
        }
        Request::Lookup { id, reply } => {
            let _ = reply.send(state.lookup(id));
        }
        Request::EmergencyLock { reply } => {
            state.emergency_lock();
            let _ = reply.send(());
        }
        Request::EmergencyUnlock { reply } => {
            state.emergency_unlock();
            let _ = reply.send(());
        }
        Request::Jobs { reply } => {
            let _ = reply.send(state.jobs());
        }
    }
}

/// Handle for submitting work to a running [`Scheduler`].
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::Sender<Request>,
    bus: Bus,
    await_poll: Duration,
}

impl SchedulerHandle {
    /// Inserts a process over `heap` and returns its job id.
    pub async fn queue(&self, heap: Heap, page: PageAddr) -> Result<JobId, VmError> {
        self.request(|reply| Request::Queue { heap, page, reply })
            .await
    }

    /// Reads the process under `id`; terminal processes are removed on
    /// observation. `Ok(None)` means the id is unknown.
    pub async fn lookup(&self, id: JobId) -> Result<Option<FarmProc>, VmError> {
        self.request(|reply| Request::Lookup { id, reply }).await
    }

    /// Hyper path: engage the emergency lock. Never creates a job.
    pub async fn emergency_lock(&self) -> Result<(), VmError> {
        self.request(|reply| Request::EmergencyLock { reply }).await
    }

    /// Hyper path: clear the emergency lock. Never creates a job.
    pub async fn emergency_unlock(&self) -> Result<(), VmError> {
        self.request(|reply| Request::EmergencyUnlock { reply })
            .await
    }

    /// Ids of all current table entries, ascending.
    pub async fn jobs(&self) -> Result<Vec<JobId>, VmError> {
        self.request(|reply| Request::Jobs { reply }).await
    }

    /// Polls `lookup` until the process reaches a terminal state, then
    /// returns the final process.
    ///
    /// - Live status → sleep `2 × tick_period` and poll again
    /// - [`VmError::Busy`] → retry immediately, without sleeping
    /// - Unknown id → [`VmError::NotFound`]
    ///
    /// There is no timeout; callers wanting bounded waits layer their own.
    pub async fn await_job(&self, id: JobId) -> Result<FarmProc, VmError> {
        loop {
            match self.try_lookup(id).await {
                Err(e) if e.is_transient() => tokio::task::yield_now().await,
                Err(e) => return Err(e),
                Ok(None) => return Err(VmError::NotFound { id }),
                Ok(Some(p)) if p.status().is_terminal() => return Ok(p),
                Ok(Some(_)) => time::sleep(self.await_poll).await,
            }
        }
    }

    /// Synchronous RPC submission.
    ///
    /// Decodes `program` and requires a `label` argument. An RPC wrapping a
    /// single emergency lock/unlock takes the hyper path and completes with
    /// [`RpcResponse::Ok`] without creating a job. Anything else is sliced,
    /// queued under [`RPC_PAGE`], and awaited; `on_complete` receives
    /// [`RpcResponse::Ok`] on `Done` and [`RpcResponse::Error`] carrying
    /// the crash reason on `Crashed`.
    pub async fn rpc_request(
        &self,
        program: serde_json::Value,
        on_complete: RpcCallback,
    ) -> Result<(), VmError> {
        let ast = Ast::decode(program)?;
        let label = ast
            .label()
            .ok_or_else(|| VmError::BadArgument {
                reason: "rpc_request requires a label argument".into(),
            })?
            .to_string();

        if let Some(signal) = ast.hyper_signal() {
            match signal {
                HyperSignal::EmergencyLock => self.emergency_lock().await?,
                HyperSignal::EmergencyUnlock => self.emergency_unlock().await?,
            }
            invoke_guarded(&self.bus, on_complete, RpcResponse::Ok { label });
            return Ok(());
        }

        let id = self.queue(Heap::slice(&ast), RPC_PAGE).await?;
        let proc = self.await_job(id).await?;
        let response = match proc.status() {
            ProcStatus::Crashed => RpcResponse::Error {
                label,
                message: proc.crash_reason().unwrap_or("unknown").to_string(),
            },
            _ => RpcResponse::Ok { label },
        };
        invoke_guarded(&self.bus, on_complete, response);
        Ok(())
    }

    /// Asynchronous sequence submission.
    ///
    /// Queues under `page` and returns the job id immediately. A background
    /// waiter awaits the outcome and invokes `on_complete` with `Ok(())` or
    /// the crash reason.
    pub async fn sequence(
        &self,
        program: serde_json::Value,
        page: PageAddr,
        on_complete: SeqCallback,
    ) -> Result<JobId, VmError> {
        let ast = Ast::decode(program)?;
        let id = self.queue(Heap::slice(&ast), page).await?;

        let waiter = self.clone();
        tokio::spawn(async move {
            let outcome = match waiter.await_job(id).await {
                Ok(p) => match p.status() {
                    ProcStatus::Crashed => {
                        Err(p.crash_reason().unwrap_or("unknown").to_string())
                    }
                    _ => Ok(()),
                },
                Err(e) => Err(e.to_string()),
            };
            invoke_guarded(&waiter.bus, on_complete, outcome);
        });
        Ok(id)
    }

    /// Sends a request, waiting for mailbox space.
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Request,
    ) -> Result<T, VmError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| VmError::Closed)?;
        rx.await.map_err(|_| VmError::Closed)
    }

    /// Non-blocking lookup: a full mailbox reports [`VmError::Busy`].
    async fn try_lookup(&self, id: JobId) -> Result<Option<FarmProc>, VmError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .try_send(Request::Lookup { id, reply })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => VmError::Busy,
                mpsc::error::TrySendError::Closed(_) => VmError::Closed,
            })?;
        rx.await.map_err(|_| VmError::Closed)
    }
}

/// Runs a user callback behind a catch-all; a panic becomes a
/// `CallbackPanicked` event.
fn invoke_guarded<T>(bus: &Bus, cb: Box<dyn FnOnce(T) + Send>, value: T) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| cb(value))) {
        bus.publish(Event::callback_panicked(panic_message(payload.as_ref())));
    }
}

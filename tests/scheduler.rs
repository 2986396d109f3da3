//! End-to-end scheduler scenarios through the public API.
//!
//! All tests run on a paused current-thread runtime: timers auto-advance,
//! so tick-driven behavior is deterministic and fast.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use farmvisor::{
    Ast, Config, Event, EventKind, FarmProc, Heap, HyperLayer, HyperSignal, Interpreter,
    InstructionKind, IoLayer, JobId, ProcStatus, RpcResponse, Scheduler, SchedulerHandle,
    StepFault, VmError,
};

/// Interpreter that walks the heap linearly, one cell per step, and marks
/// the process `Done` past the last cell. A single kind can be scripted to
/// fault.
struct StepThrough {
    crash_on: Option<InstructionKind>,
}

impl StepThrough {
    fn new() -> Self {
        Self { crash_on: None }
    }

    fn crash_on(kind: InstructionKind) -> Self {
        Self {
            crash_on: Some(kind),
        }
    }
}

impl Interpreter for StepThrough {
    fn step(&self, mut p: FarmProc) -> Result<FarmProc, StepFault> {
        let kind = p.pc_kind();
        if self.crash_on == Some(kind) {
            return Err(StepFault::Fault {
                message: format!("scripted fault at {kind:?}"),
            });
        }
        let next = p.pc() + 1;
        if next >= p.heap().len() {
            p.set_status(ProcStatus::Done);
        } else {
            p.set_pc(next);
        }
        Ok(p)
    }
}

fn noop_io() -> IoLayer {
    Arc::new(|_ast| Ok(serde_json::Value::Null))
}

fn recording_hyper() -> (HyperLayer, Arc<Mutex<Vec<HyperSignal>>>) {
    let signals = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&signals);
    let layer: HyperLayer = Arc::new(move |signal| {
        sink.lock().unwrap().push(signal);
    });
    (layer, signals)
}

/// Scheduler + handle + event stream, started with the given interpreter.
fn start(
    interp: impl Interpreter,
) -> (
    SchedulerHandle,
    broadcast::Receiver<Event>,
    Arc<Mutex<Vec<HyperSignal>>>,
    CancellationToken,
) {
    let (hyper, signals) = recording_hyper();
    let scheduler = Scheduler::new(
        Config::default(),
        Arc::new(interp),
        noop_io(),
        hyper,
        Vec::new(),
    );
    let handle = scheduler.handle();
    let events = scheduler.subscribe_events();
    let token = CancellationToken::new();
    scheduler.run(token.clone());
    (handle, events, signals, token)
}

fn linear_heap(kinds: &[InstructionKind]) -> Heap {
    let root = Ast::new(kinds[0]).with_body(kinds[1..].iter().map(|&k| Ast::new(k)).collect());
    Heap::slice(&root)
}

/// Receives events until one matches, with a coarse safety timeout.
async fn next_matching(
    rx: &mut broadcast::Receiver<Event>,
    mut pred: impl FnMut(&Event) -> bool,
) -> Event {
    timeout(Duration::from_secs(30), async {
        loop {
            match rx.recv().await {
                Ok(ev) if pred(&ev) => return ev,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
            }
        }
    })
    .await
    .expect("no matching event before timeout")
}

#[tokio::test(start_paused = true)]
async fn emergency_lock_rpc_takes_hyper_path() {
    let (handle, mut events, signals, _token) = start(StepThrough::new());

    let delivered = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&delivered);
    handle
        .rpc_request(
            serde_json::json!({
                "kind": "rpc_request",
                "args": {"label": "estop-now"},
                "body": [{"kind": "emergency_lock"}]
            }),
            Box::new(move |resp| {
                *sink.lock().unwrap() = Some(resp);
            }),
        )
        .await
        .unwrap();

    assert_eq!(
        delivered.lock().unwrap().take(),
        Some(RpcResponse::Ok {
            label: "estop-now".into()
        })
    );
    assert_eq!(
        signals.lock().unwrap().as_slice(),
        &[HyperSignal::EmergencyLock]
    );
    // The hyper path never creates a job.
    assert!(handle.jobs().await.unwrap().is_empty());
    next_matching(&mut events, |e| e.kind == EventKind::LockEngaged).await;
}

#[tokio::test(start_paused = true)]
async fn rpc_round_trip_completes_and_cleans_up() {
    let (handle, _events, _signals, _token) = start(StepThrough::new());

    let delivered = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&delivered);
    handle
        .rpc_request(
            serde_json::json!({
                "kind": "rpc_request",
                "args": {"label": "move-it"},
                "body": [{"kind": "move_absolute", "args": {"x": 1, "y": 2, "z": 0}}]
            }),
            Box::new(move |resp| {
                *sink.lock().unwrap() = Some(resp);
            }),
        )
        .await
        .unwrap();

    assert_eq!(
        delivered.lock().unwrap().take(),
        Some(RpcResponse::Ok {
            label: "move-it".into()
        })
    );
    // await_job's terminal observation already removed the entry.
    assert!(handle.jobs().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn rpc_without_label_is_an_argument_error() {
    let (handle, _events, _signals, _token) = start(StepThrough::new());

    let invoked = Arc::new(Mutex::new(false));
    let sink = Arc::clone(&invoked);
    let err = handle
        .rpc_request(
            serde_json::json!({
                "kind": "rpc_request",
                "body": [{"kind": "sync"}]
            }),
            Box::new(move |_resp| {
                *sink.lock().unwrap() = true;
            }),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, VmError::BadArgument { .. }));
    assert!(!*invoked.lock().unwrap());
    assert!(handle.jobs().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn crashed_rpc_reports_the_crash_reason() {
    let (handle, _events, _signals, _token) =
        start(StepThrough::crash_on(InstructionKind::WritePin));

    let delivered = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&delivered);
    handle
        .rpc_request(
            serde_json::json!({
                "kind": "rpc_request",
                "args": {"label": "pin-on"},
                "body": [{"kind": "write_pin", "args": {"pin": 7, "value": 1}}]
            }),
            Box::new(move |resp| {
                *sink.lock().unwrap() = Some(resp);
            }),
        )
        .await
        .unwrap();

    let result = delivered.lock().unwrap().take();
    match result {
        Some(RpcResponse::Error { label, message }) => {
            assert_eq!(label, "pin-on");
            assert!(message.contains("scripted fault"));
        }
        other => panic!("expected an error response, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn sequence_completes_in_the_background() {
    let (handle, _events, _signals, _token) = start(StepThrough::new());

    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    let id = handle
        .sequence(
            serde_json::json!({
                "kind": "sequence",
                "args": {"label": "morning watering"},
                "body": [
                    {"kind": "find_home"},
                    {"kind": "write_pin", "args": {"pin": 8, "value": 1}}
                ]
            }),
            12,
            Box::new(move |outcome| {
                let _ = done_tx.send(outcome);
            }),
        )
        .await
        .unwrap();

    let outcome = timeout(Duration::from_secs(30), done_rx)
        .await
        .expect("waiter should finish")
        .unwrap();
    assert_eq!(outcome, Ok(()));
    assert!(handle.lookup(id).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn crashed_sequence_reports_reason_to_the_waiter() {
    let (handle, _events, _signals, _token) =
        start(StepThrough::crash_on(InstructionKind::ReadPin));

    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    handle
        .sequence(
            serde_json::json!({
                "kind": "sequence",
                "body": [{"kind": "read_pin", "args": {"pin": 3}}]
            }),
            5,
            Box::new(move |outcome| {
                let _ = done_tx.send(outcome);
            }),
        )
        .await
        .unwrap();

    let outcome = timeout(Duration::from_secs(30), done_rx)
        .await
        .expect("waiter should finish")
        .unwrap();
    let reason = outcome.unwrap_err();
    assert!(reason.contains("scripted fault"));
}

#[tokio::test(start_paused = true)]
async fn await_on_unknown_id_is_an_argument_error() {
    let (handle, _events, _signals, _token) = start(StepThrough::new());

    let err = handle.await_job(JobId::new(999)).await.unwrap_err();
    assert!(matches!(err, VmError::NotFound { .. }));
}

#[tokio::test(start_paused = true)]
async fn queue_await_round_trip_preserves_identity() {
    let (handle, _events, _signals, _token) = start(StepThrough::new());

    let id = handle
        .queue(linear_heap(&[InstructionKind::Wait, InstructionKind::Wait]), -1)
        .await
        .unwrap();

    // An intermediate lookup of the live process sees the same identity the
    // final process carries.
    let live = handle
        .lookup(id)
        .await
        .unwrap()
        .expect("job just queued is present");
    let finished = handle.await_job(id).await.unwrap();
    assert_eq!(finished.proc_ref(), live.proc_ref());
    assert!(finished.status().is_terminal());

    // Terminal observation removed it.
    assert!(handle.lookup(id).await.unwrap().is_none());
    let err = handle.await_job(id).await.unwrap_err();
    assert!(matches!(err, VmError::NotFound { .. }));
}

#[tokio::test(start_paused = true)]
async fn round_robin_steps_three_jobs_evenly() {
    let (handle, mut events, _signals, _token) = start(StepThrough::new());
    let program = [
        InstructionKind::Wait,
        InstructionKind::Wait,
        InstructionKind::Wait,
    ];

    let a = handle.queue(linear_heap(&program), -1).await.unwrap();
    let b = handle.queue(linear_heap(&program), -1).await.unwrap();
    let c = handle.queue(linear_heap(&program), -1).await.unwrap();

    let mut order = Vec::new();
    while order.len() < 9 {
        let ev = next_matching(&mut events, |e| e.kind == EventKind::ProcStepped).await;
        order.push(ev.job.unwrap());
    }

    // Strict rotation, three steps each.
    assert_eq!(order, vec![a, b, c, a, b, c, a, b, c]);
    for id in [a, b, c] {
        assert_eq!(order.iter().filter(|&&j| j == id).count(), 3);
    }
}

#[tokio::test(start_paused = true)]
async fn firmware_contention_serializes_two_sequences() {
    let (handle, mut events, _signals, _token) = start(StepThrough::new());

    let a = handle
        .queue(
            linear_heap(&[InstructionKind::MoveAbsolute, InstructionKind::MoveAbsolute]),
            -1,
        )
        .await
        .unwrap();
    let b = handle
        .queue(linear_heap(&[InstructionKind::WritePin]), -1)
        .await
        .unwrap();

    // A claims the firmware on its first permitted step.
    let claimed = next_matching(&mut events, |e| e.kind == EventKind::FirmwareClaimed).await;
    assert_eq!(claimed.job, Some(a));

    // While A holds the claim, B's firmware instruction is denied.
    let skipped = next_matching(&mut events, |e| e.kind == EventKind::ProcSkipped).await;
    assert_eq!(skipped.job, Some(b));
    assert_eq!(skipped.reason, Some("interlock"));

    // A finishes; its cleanup releases the firmware, then B claims it.
    let finished = handle.await_job(a).await.unwrap();
    assert_eq!(finished.status(), ProcStatus::Done);
    next_matching(&mut events, |e| e.kind == EventKind::FirmwareReleased).await;

    let reclaimed = next_matching(&mut events, |e| e.kind == EventKind::FirmwareClaimed).await;
    assert_eq!(reclaimed.job, Some(b));
    assert_eq!(handle.await_job(b).await.unwrap().status(), ProcStatus::Done);
}

#[tokio::test(start_paused = true)]
async fn emergency_lock_pauses_and_unlock_resumes() {
    let (handle, mut events, signals, _token) = start(StepThrough::new());

    let program = [InstructionKind::MoveAbsolute; 8];
    let id = handle.queue(linear_heap(&program), -1).await.unwrap();

    // Let it make some progress first.
    next_matching(&mut events, |e| e.kind == EventKind::ProcStepped).await;

    handle.emergency_lock().await.unwrap();
    // No later than the first tick after acknowledgment, the process is
    // denied instead of stepped.
    let skipped = next_matching(&mut events, |e| e.kind == EventKind::ProcSkipped).await;
    assert_eq!(skipped.job, Some(id));
    assert_eq!(skipped.reason, Some("interlock"));
    // Still live the whole time.
    let live = handle.lookup(id).await.unwrap().expect("still present");
    assert!(!live.status().is_terminal());

    handle.emergency_unlock().await.unwrap();
    let resumed = next_matching(&mut events, |e| e.kind == EventKind::ProcStepped).await;
    assert_eq!(resumed.job, Some(id));

    assert_eq!(handle.await_job(id).await.unwrap().status(), ProcStatus::Done);
    assert_eq!(
        signals.lock().unwrap().as_slice(),
        &[HyperSignal::EmergencyLock, HyperSignal::EmergencyUnlock]
    );
}

#[tokio::test(start_paused = true)]
async fn a_panicking_callback_cannot_crash_the_scheduler() {
    let (handle, mut events, _signals, _token) = start(StepThrough::new());

    handle
        .rpc_request(
            serde_json::json!({
                "kind": "rpc_request",
                "args": {"label": "boomer"},
                "body": [{"kind": "sync"}]
            }),
            Box::new(|_resp| panic!("user callback exploded")),
        )
        .await
        .unwrap();

    let diag = next_matching(&mut events, |e| e.kind == EventKind::CallbackPanicked).await;
    assert!(diag
        .error
        .as_deref()
        .unwrap()
        .contains("user callback exploded"));

    // The scheduler keeps serving.
    let id = handle
        .queue(linear_heap(&[InstructionKind::Wait]), -1)
        .await
        .unwrap();
    assert!(handle.await_job(id).await.unwrap().status().is_terminal());
}

#[tokio::test(start_paused = true)]
async fn cancellation_closes_the_request_port() {
    let (handle, _events, _signals, token) = start(StepThrough::new());

    token.cancel();
    // Give the actor a chance to observe the cancellation and drop its
    // mailbox.
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }

    let err = handle
        .queue(linear_heap(&[InstructionKind::Wait]), -1)
        .await
        .unwrap_err();
    assert!(matches!(err, VmError::Closed));
}

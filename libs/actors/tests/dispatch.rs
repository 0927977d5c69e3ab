//! End-to-end dispatch scenarios over the in-process worker transport
//!
//! Drives the full path: resolve -> launch -> initialize -> readiness ->
//! call -> typed dispatch -> reply -> caller resumes. The in-process
//! launcher exchanges exactly the same frames as a real worker process.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use worker_actors::{
    ActorName, ActorSystem, CallEncoder, CallEnvelope, CallError, CallId, EntryPoint, Frame,
    InProcessLauncher, LaunchError, MessagePort, MethodTable, Peer, PortError, ReplyEnvelope,
    ReplyPayload, SystemConfig, TransferList, WireValue, WorkerActor, WorkerLauncher,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Counter {
    value: i64,
}

impl WorkerActor for Counter {
    fn type_name() -> &'static str {
        "Counter"
    }

    fn create(_system: &ActorSystem) -> Self {
        Counter { value: 0 }
    }

    fn methods(table: &mut MethodTable<Self>) {
        table.method("increment", |actor, mut args| async move {
            let amount: i64 = args.next()?;
            let mut counter = actor.lock().await;
            counter.value += amount;
            Ok(counter.value)
        });

        table.method("value", |actor, _args| async move {
            Ok(actor.lock().await.value)
        });
    }
}

struct Sleeper;

impl WorkerActor for Sleeper {
    fn type_name() -> &'static str {
        "Sleeper"
    }

    fn create(_system: &ActorSystem) -> Self {
        Sleeper
    }

    fn methods(table: &mut MethodTable<Self>) {
        table.method("slow", |_actor, _args| async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok("slow".to_string())
        });

        table.method("fast", |_actor, _args| async move {
            Ok("fast".to_string())
        });
    }
}

struct Ledger;

impl WorkerActor for Ledger {
    fn type_name() -> &'static str {
        "Ledger"
    }

    fn create(_system: &ActorSystem) -> Self {
        Ledger
    }

    fn methods(table: &mut MethodTable<Self>) {
        table.method("withdraw", |_actor, mut args| async move {
            let amount: i64 = args.next()?;
            if amount > 100 {
                return Err(anyhow::anyhow!("insufficient funds for {amount}").into());
            }
            Ok(amount)
        });
    }
}

struct Blob;

impl WorkerActor for Blob {
    fn type_name() -> &'static str {
        "Blob"
    }

    fn create(_system: &ActorSystem) -> Self {
        Blob
    }

    fn methods(table: &mut MethodTable<Self>) {
        table.method("size", |_actor, mut args| async move {
            let data: Vec<u8> = args.next()?;
            Ok(data.len() as i64)
        });
    }
}

/// Records call arguments in the order they were dispatched
struct Recorder {
    log: Arc<Mutex<Vec<i64>>>,
}

impl WorkerActor for Recorder {
    fn type_name() -> &'static str {
        "Recorder"
    }

    fn create(_system: &ActorSystem) -> Self {
        Recorder {
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn methods(table: &mut MethodTable<Self>) {
        table.method("record", |actor, mut args| async move {
            let n: i64 = args.next()?;
            let recorder = actor.lock().await;
            recorder.log.lock().push(n);
            Ok(n)
        });
    }
}

fn worker_config() -> SystemConfig {
    SystemConfig::new(InProcessLauncher::new(worker_config))
        .host_type::<Counter>()
        .host_type::<Sleeper>()
        .host_type::<Ledger>()
        .host_type::<Blob>()
}

fn root_system() -> ActorSystem {
    ActorSystem::new(worker_config())
}

/// Captures frames a hosted system posts to its host
#[derive(Clone)]
struct CapturePort {
    tx: mpsc::UnboundedSender<Frame>,
}

impl MessagePort for CapturePort {
    fn post(&self, frame: Frame, _transfer: TransferList) -> Result<(), PortError> {
        self.tx.send(frame).map_err(|_| PortError::Closed)
    }
}

async fn next_reply(rx: &mut mpsc::UnboundedReceiver<Frame>) -> ReplyEnvelope {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for a reply frame")
            .expect("host channel closed");
        match frame {
            Frame::Reply(envelope) => return envelope,
            other => assert_eq!(other, Frame::ProcessReady),
        }
    }
}

fn call_frame(id: u64, recipient: &str, target: &str, args: Vec<WireValue>) -> Frame {
    Frame::RemoteCall(CallEnvelope {
        call_id: CallId::from_raw(id),
        recipient: ActorName::for_type(recipient),
        target: target.to_string(),
        generic_subs: vec![],
        args,
    })
}

#[tokio::test]
async fn remote_call_round_trips_through_a_worker() {
    init_tracing();
    let system = root_system();

    let counter = system.resolve::<Counter>().unwrap();
    assert!(!counter.is_local());

    let value: i64 = counter
        .invoke("increment", CallEncoder::new().arg(&5i64).unwrap())
        .await
        .unwrap();
    assert_eq!(value, 5);

    let value: i64 = counter
        .invoke("increment", CallEncoder::new().arg(&2i64).unwrap())
        .await
        .unwrap();
    assert_eq!(value, 7);

    let stats = system.metrics().snapshot();
    assert_eq!(stats.calls_sent, 2);
    assert_eq!(stats.replies_matched, 2);
}

/// Launcher whose workers take a while to come up: frames must queue in
/// the handle until the readiness announcement arrives.
struct DeferredLauncher {
    delay: Duration,
}

impl WorkerLauncher for DeferredLauncher {
    fn launch(
        &self,
        _entry: &EntryPoint,
        host: Box<dyn MessagePort>,
    ) -> Result<Box<dyn MessagePort>, LaunchError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let worker = ActorSystem::hosted(worker_config(), host);
            while let Some(frame) = rx.recv().await {
                worker.deliver(Peer::Host, frame);
            }
        });
        Ok(Box::new(ForwardPort { tx }))
    }
}

struct ForwardPort {
    tx: mpsc::UnboundedSender<Frame>,
}

impl MessagePort for ForwardPort {
    fn post(&self, frame: Frame, _transfer: TransferList) -> Result<(), PortError> {
        self.tx.send(frame).map_err(|_| PortError::Closed)
    }
}

#[tokio::test]
async fn calls_to_a_not_yet_ready_worker_deliver_after_readiness() {
    init_tracing();
    let delay = Duration::from_millis(50);
    let system = ActorSystem::new(SystemConfig::new(DeferredLauncher { delay }));

    let counter = system.resolve::<Counter>().unwrap();
    let started = Instant::now();
    let value: i64 = counter
        .invoke("increment", CallEncoder::new().arg(&5i64).unwrap())
        .await
        .unwrap();

    assert_eq!(value, 5);
    assert!(started.elapsed() >= delay);
}

#[tokio::test]
async fn replies_resolve_their_own_calls_regardless_of_arrival_order() {
    init_tracing();
    let system = root_system();
    let sleeper = system.resolve::<Sleeper>().unwrap();

    let slow = sleeper.invoke::<String>("slow", CallEncoder::new());
    let fast = sleeper.invoke::<String>("fast", CallEncoder::new());
    let (slow, fast) = tokio::join!(slow, fast);

    assert_eq!(slow.unwrap(), "slow");
    assert_eq!(fast.unwrap(), "fast");

    let stats = system.metrics().snapshot();
    assert_eq!(stats.replies_matched, 2);
    assert_eq!(stats.replies_discarded, 0);
}

#[tokio::test]
async fn dead_letters_dispatch_in_arrival_order_on_registration() {
    init_tracing();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let system = ActorSystem::hosted(
        SystemConfig::new(InProcessLauncher::new(worker_config)),
        Box::new(CapturePort { tx }),
    );

    for id in 1..=3i64 {
        system.deliver(
            Peer::Host,
            call_frame(id as u64, "Recorder", "record", vec![WireValue::Number(id as f64)]),
        );
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(system.metrics().snapshot().dead_letters_queued, 3);

    let log = Arc::new(Mutex::new(Vec::new()));
    system.register(Recorder {
        log: Arc::clone(&log),
    });

    let mut seen = Vec::new();
    for _ in 0..3 {
        let reply = next_reply(&mut rx).await;
        match reply.payload {
            ReplyPayload::Return(Some(WireValue::Number(n))) => seen.push(n as i64),
            other => panic!("unexpected reply payload: {other:?}"),
        }
    }

    assert_eq!(*log.lock(), vec![1, 2, 3]);
    assert_eq!(seen.len(), 3);

    let stats = system.metrics().snapshot();
    assert_eq!(stats.dead_letters_drained, 3);
}

#[tokio::test]
async fn scenario_call_42_against_a_seeded_counter() {
    init_tracing();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let system = ActorSystem::hosted(
        SystemConfig::new(InProcessLauncher::new(worker_config)),
        Box::new(CapturePort { tx }),
    );

    system.register(Counter { value: 1 });
    system.deliver(
        Peer::Host,
        call_frame(42, "Counter", "increment", vec![WireValue::Number(5.0)]),
    );

    let reply = next_reply(&mut rx).await;
    assert_eq!(reply.call_id, CallId::from_raw(42));
    assert_eq!(reply.sender, Some(ActorName::for_type("Counter")));
    assert_eq!(reply.payload, ReplyPayload::Return(Some(WireValue::Number(6.0))));
}

#[tokio::test]
async fn unmatched_replies_are_silently_discarded() {
    init_tracing();
    let system = root_system();

    system.deliver(
        Peer::Host,
        Frame::Reply(ReplyEnvelope {
            call_id: CallId::from_raw(999),
            sender: None,
            payload: ReplyPayload::Return(None),
        }),
    );
    tokio::time::sleep(Duration::from_millis(20)).await;

    let stats = system.metrics().snapshot();
    assert_eq!(stats.replies_discarded, 1);
    assert_eq!(stats.replies_matched, 0);
}

#[tokio::test]
async fn resolving_a_registered_actor_returns_the_same_instance() {
    init_tracing();
    let system = root_system();
    system.register(Counter { value: 10 });

    let first = system.resolve::<Counter>().unwrap();
    let second = system.resolve::<Counter>().unwrap();
    assert!(first.is_local());
    assert!(second.is_local());

    let value: i64 = first
        .invoke("increment", CallEncoder::new().arg(&1i64).unwrap())
        .await
        .unwrap();
    assert_eq!(value, 11);

    let instance = second.local().expect("local instance");
    assert_eq!(instance.lock().await.value, 11);

    // Local dispatch never touches the wire.
    assert_eq!(system.metrics().snapshot().calls_sent, 0);
}

/// Wraps the in-process launcher to count how many workers it creates
struct CountingLauncher {
    launches: Arc<AtomicUsize>,
    inner: InProcessLauncher,
}

impl WorkerLauncher for CountingLauncher {
    fn launch(
        &self,
        entry: &EntryPoint,
        host: Box<dyn MessagePort>,
    ) -> Result<Box<dyn MessagePort>, LaunchError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.inner.launch(entry, host)
    }
}

#[tokio::test]
async fn resolving_twice_reuses_the_worker() {
    init_tracing();
    let launches = Arc::new(AtomicUsize::new(0));
    let system = ActorSystem::new(SystemConfig::new(CountingLauncher {
        launches: Arc::clone(&launches),
        inner: InProcessLauncher::new(worker_config),
    }));

    let first = system.resolve::<Counter>().unwrap();
    let second = system.resolve::<Counter>().unwrap();
    assert_eq!(launches.load(Ordering::SeqCst), 1);

    let _: i64 = first
        .invoke("increment", CallEncoder::new().arg(&3i64).unwrap())
        .await
        .unwrap();
    let value: i64 = second
        .invoke("value", CallEncoder::new())
        .await
        .unwrap();
    assert_eq!(value, 3);
}

#[tokio::test]
async fn application_errors_resolve_the_caller_with_a_typed_fault() {
    init_tracing();
    let system = root_system();
    let ledger = system.resolve::<Ledger>().unwrap();

    let ok: i64 = ledger
        .invoke("withdraw", CallEncoder::new().arg(&50i64).unwrap())
        .await
        .unwrap();
    assert_eq!(ok, 50);

    let err = ledger
        .invoke::<i64>("withdraw", CallEncoder::new().arg(&500i64).unwrap())
        .await
        .unwrap_err();
    match err {
        CallError::Fault(fault) => {
            assert_eq!(fault.kind, "application");
            assert!(fault.message.contains("insufficient funds"));
        }
        other => panic!("expected a fault, got {other}"),
    }

    assert_eq!(system.metrics().snapshot().faults_returned, 1);
}

#[tokio::test]
async fn binary_buffers_pass_through_opaquely() {
    init_tracing();
    let system = root_system();
    let blob = system.resolve::<Blob>().unwrap();

    let payload = bytes::Bytes::from_static(b"\x00\x01\x02payload");
    let size: i64 = blob
        .invoke(
            "size",
            CallEncoder::new()
                .arg(&payload)
                .unwrap()
                .transfer(payload.clone()),
        )
        .await
        .unwrap();
    assert_eq!(size, payload.len() as i64);
}

#[tokio::test]
async fn unknown_methods_fault_instead_of_hanging_the_caller() {
    init_tracing();
    let system = root_system();
    let counter = system.resolve::<Counter>().unwrap();

    let err = counter
        .invoke::<i64>("decrement", CallEncoder::new())
        .await
        .unwrap_err();
    match err {
        CallError::Fault(fault) => assert_eq!(fault.kind, "unknownMethod"),
        other => panic!("expected a fault, got {other}"),
    }
}

#[tokio::test]
async fn initialize_for_an_unregistered_type_is_dropped() {
    init_tracing();
    let system = root_system();

    system.deliver(Peer::Host, Frame::Initialize(ActorName::for_type("Ghost")));
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Nothing registered, nothing crashed; the frame was reported and dropped.
    let ghost_call = call_frame(7, "Ghost", "haunt", vec![]);
    system.deliver(Peer::Host, ghost_call);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(system.metrics().snapshot().dead_letters_queued, 1);
}

#[tokio::test]
#[should_panic(expected = "only a single instance")]
async fn double_registration_is_fatal() {
    let system = root_system();
    system.register(Counter { value: 0 });
    system.register(Counter { value: 0 });
}

#[tokio::test]
async fn shutdown_resolves_suspended_callers() {
    init_tracing();
    let system = ActorSystem::new(SystemConfig::new(DeferredLauncher {
        // Long enough that the call is still suspended when we shut down.
        delay: Duration::from_secs(30),
    }));

    let counter = system.resolve::<Counter>().unwrap();
    let call = counter.invoke::<i64>("increment", CallEncoder::new().arg(&1i64).unwrap());

    let teardown = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        system.shutdown();
    };

    let (result, ()) = tokio::join!(call, teardown);
    assert!(matches!(result, Err(CallError::SystemShutDown)));
}

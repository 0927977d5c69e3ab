//! Actor directory and dispatch
//!
//! One [`ActorSystem`] exists per process. It owns all dispatch state:
//! the local actor registry, the pending-call table, the dead-letter
//! queue, and the handle for every worker process it has launched. State
//! is never shared across processes; envelopes cross the boundary by
//! value.
//!
//! A single receive loop per system consumes inbound frames sequentially.
//! Method invocations are spawned as detached tasks so a slow method
//! never blocks readiness announcements, other calls, or replies behind
//! it; invocation failures come back to the caller through the reply
//! fault channel rather than being awaited by the loop.
//!
//! Sending a remote call is the only suspension point application code
//! sees: the caller awaits until the matching reply resolves its
//! pending-table entry. There is no timeout — a call whose reply never
//! arrives suspends its caller until the system shuts down.

use crate::actor::{CallDecoder, CallEncoder, ManagedActor, WorkerActor};
use crate::error::{CallError, ResolveError};
use crate::handle::WorkerHandle;
use crate::launch::{EntryPoint, MessagePort, WorkerLauncher};
use crate::metrics::DispatchMetrics;
use crate::registry::ActorTypeRegistry;
use parking_lot::Mutex;
use protocol::{
    ActorName, CallEnvelope, CallId, Frame, ReplyEnvelope, ReplyPayload, TransferList,
};
use serde::de::DeserializeOwned;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;
use wire::{from_wire, WireValue};

/// Where an inbound frame came from, and where its reply must go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Peer {
    /// The process that launched this one
    Host,
    /// A worker this process launched, identified by the actor it hosts
    Worker(ActorName),
}

pub(crate) struct Inbound {
    pub from: Peer,
    pub frame: Frame,
}

/// Message port that feeds a system's receive loop directly
pub(crate) struct InboxPort {
    pub tx: mpsc::UnboundedSender<Inbound>,
    pub from: Peer,
}

impl MessagePort for InboxPort {
    fn post(&self, frame: Frame, _transfer: TransferList) -> Result<(), crate::error::PortError> {
        // Buffers inside the frame are refcounted; nothing to copy.
        self.tx
            .send(Inbound {
                from: self.from.clone(),
                frame,
            })
            .map_err(|_| crate::error::PortError::Closed)
    }
}

/// Configuration for one dispatch system
pub struct SystemConfig {
    types: ActorTypeRegistry,
    launcher: Box<dyn WorkerLauncher>,
    default_entry: EntryPoint,
}

impl SystemConfig {
    pub fn new(launcher: impl WorkerLauncher + 'static) -> Self {
        Self {
            types: ActorTypeRegistry::new(),
            launcher: Box::new(launcher),
            default_entry: EntryPoint::from_environment(),
        }
    }

    /// Make `A` constructible when this system receives `initialize`
    pub fn host_type<A: WorkerActor>(mut self) -> Self {
        self.types.register::<A>();
        self
    }

    /// Entry point used for actor types that do not declare their own
    pub fn default_entry(mut self, entry: EntryPoint) -> Self {
        self.default_entry = entry;
        self
    }
}

#[derive(Default)]
struct DispatchState {
    /// Actors managed by this process, at most one per identity
    managed: HashMap<ActorName, ManagedActor>,
    /// Handles for worker processes this system launched
    workers: HashMap<ActorName, WorkerHandle>,
    /// Calls awaiting replies
    pending: HashMap<CallId, oneshot::Sender<Result<Option<WireValue>, protocol::CallFault>>>,
    /// Inbound calls whose recipient has not registered yet, in arrival
    /// order, each with the peer its reply must go to
    dead_letters: VecDeque<(Peer, CallEnvelope)>,
}

struct SystemInner {
    system_id: String,
    types: ActorTypeRegistry,
    launcher: Box<dyn WorkerLauncher>,
    default_entry: EntryPoint,
    /// Port to the process that launched this one, when hosted
    host: Option<Box<dyn MessagePort>>,
    inbox: mpsc::UnboundedSender<Inbound>,
    state: Mutex<DispatchState>,
    next_call: AtomicU64,
    metrics: Arc<DispatchMetrics>,
    receive_task: Mutex<Option<JoinHandle<()>>>,
}

/// The per-process actor directory and dispatcher
#[derive(Clone)]
pub struct ActorSystem {
    inner: Arc<SystemInner>,
}

impl ActorSystem {
    /// Create a root system (one with no host process).
    /// Must be called within a tokio runtime: the receive loop is spawned
    /// immediately.
    pub fn new(config: SystemConfig) -> Self {
        Self::build(config, None)
    }

    /// Create a hosted system: one running as a worker. Announces
    /// readiness to the host exactly once, here.
    pub fn hosted(config: SystemConfig, host: Box<dyn MessagePort>) -> Self {
        Self::build(config, Some(host))
    }

    fn build(config: SystemConfig, host: Option<Box<dyn MessagePort>>) -> Self {
        let SystemConfig {
            types,
            launcher,
            default_entry,
        } = config;

        let (tx, rx) = mpsc::unbounded_channel();
        let system_id = format!("dispatch-{}", Uuid::new_v4());
        info!(system_id = %system_id, hosted = host.is_some(), "creating dispatch system");

        let system = Self {
            inner: Arc::new(SystemInner {
                system_id,
                types,
                launcher,
                default_entry,
                host,
                inbox: tx,
                state: Mutex::new(DispatchState::default()),
                next_call: AtomicU64::new(1),
                metrics: Arc::new(DispatchMetrics::default()),
                receive_task: Mutex::new(None),
            }),
        };

        let task = tokio::spawn(Self::receive_loop(system.clone(), rx));
        *system.inner.receive_task.lock() = Some(task);

        if let Some(port) = &system.inner.host {
            if let Err(e) = port.post(Frame::ProcessReady, Vec::new()) {
                warn!(error = %e, "failed to announce readiness to host");
            }
        }

        system
    }

    /// Deterministic identity for an actor type. Pure: the same type
    /// always yields an equal identity.
    pub fn identity_of<A: WorkerActor>() -> ActorName {
        ActorName::for_type(A::type_name())
    }

    pub fn system_id(&self) -> &str {
        &self.inner.system_id
    }

    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    /// Register a locally running actor instance.
    ///
    /// Panics on a second registration for the same identity: the
    /// addressing policy is one instance per type and process. On
    /// success, dead letters addressed to this identity are dispatched in
    /// their original arrival order.
    pub fn register<A: WorkerActor>(&self, actor: A) {
        let name = Self::identity_of::<A>();
        let managed = ManagedActor::from_actor(actor);

        let drained: Vec<(Peer, CallEnvelope)> = {
            let mut state = self.inner.state.lock();
            if state.managed.contains_key(&name) {
                panic!("only a single instance of an actor is allowed per identity: {name}");
            }
            state.managed.insert(name.clone(), managed.clone());

            let mut kept = VecDeque::new();
            let mut drained = Vec::new();
            while let Some((peer, envelope)) = state.dead_letters.pop_front() {
                if envelope.recipient == name {
                    drained.push((peer, envelope));
                } else {
                    kept.push_back((peer, envelope));
                }
            }
            state.dead_letters = kept;
            drained
        };

        info!(actor = %name, dead_letters = drained.len(), "registered local actor");
        for (peer, envelope) in drained {
            self.inner.metrics.record_dead_letter_drained();
            self.spawn_invocation(peer, envelope, managed.clone());
        }
    }

    /// Resolve an actor type to a local instance or a worker handle.
    ///
    /// A locally registered instance is returned directly — no round
    /// trip. Otherwise the existing worker is reused, or a new worker
    /// process is launched and sent `initialize` (queued until the worker
    /// announces readiness). Launch failure is recoverable.
    pub fn resolve<A: WorkerActor>(&self) -> Result<ActorRef<A>, ResolveError> {
        let name = Self::identity_of::<A>();
        let mut state = self.inner.state.lock();

        if let Some(managed) = state.managed.get(&name) {
            let instance = managed.typed::<A>().unwrap_or_else(|| {
                panic!("actor registered under {name} is not a {}", A::type_name())
            });
            return Ok(ActorRef {
                name,
                kind: RefKind::Local {
                    instance,
                    managed: managed.clone(),
                },
            });
        }

        if state.workers.contains_key(&name) {
            return Ok(ActorRef {
                name,
                kind: RefKind::Remote {
                    system: self.clone(),
                },
            });
        }

        let entry = A::entry_point().unwrap_or_else(|| self.inner.default_entry.clone());
        info!(worker = %name, location = %entry.location, "launching worker process");

        let host_port = Box::new(InboxPort {
            tx: self.inner.inbox.clone(),
            from: Peer::Worker(name.clone()),
        });
        let port = self
            .inner
            .launcher
            .launch(&entry, host_port)
            .map_err(|source| ResolveError::Launch {
                name: name.clone(),
                source,
            })?;

        let mut handle = WorkerHandle::new(name.clone(), port);
        handle.post(Frame::Initialize(name.clone()), Vec::new());
        state.workers.insert(name.clone(), handle);

        Ok(ActorRef {
            name,
            kind: RefKind::Remote {
                system: self.clone(),
            },
        })
    }

    /// Hand a call envelope to the recipient's worker handle.
    ///
    /// Panics when no handle exists: `resolve` must always precede a
    /// call, so a missing handle is an invariant violation, not a
    /// recoverable condition.
    pub fn send_call(&self, envelope: CallEnvelope, transfer: TransferList) {
        let mut state = self.inner.state.lock();
        match state.workers.get_mut(&envelope.recipient) {
            Some(handle) => {
                trace!(call_id = %envelope.call_id, worker = %envelope.recipient, "posting call");
                handle.post(Frame::RemoteCall(envelope), transfer);
                self.inner.metrics.record_call_sent();
            }
            None => panic!(
                "send_call: no worker handle for {}; resolve must precede a call",
                envelope.recipient
            ),
        }
    }

    /// Feed one inbound frame into this system's receive loop, as if it
    /// had arrived from `from`. Transport integrations and tests use this
    /// to wire custom channels.
    pub fn deliver(&self, from: Peer, frame: Frame) {
        if self
            .inner
            .inbox
            .send(Inbound { from, frame })
            .is_err()
        {
            warn!("inbound frame dropped; receive loop is gone");
        }
    }

    /// Tear the system down: stops the receive loop and resolves every
    /// pending call with a shutdown error.
    pub fn shutdown(&self) {
        info!(system_id = %self.inner.system_id, "shutting down dispatch system");
        if let Some(task) = self.inner.receive_task.lock().take() {
            task.abort();
        }
        let mut state = self.inner.state.lock();
        state.pending.clear();
        state.workers.clear();
    }

    pub(crate) async fn call_remote(
        &self,
        recipient: ActorName,
        target: &str,
        encoder: CallEncoder,
    ) -> Result<Option<WireValue>, CallError> {
        let call_id = CallId::from_raw(self.inner.next_call.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();
        let (generic_subs, args, transfer) = encoder.into_parts();
        let envelope = CallEnvelope {
            call_id,
            recipient,
            target: target.to_string(),
            generic_subs,
            args,
        };

        // The pending entry must exist before the call leaves, so a fast
        // reply always finds it.
        self.inner.state.lock().pending.insert(call_id, tx);
        self.send_call(envelope, transfer);

        debug!(%call_id, "caller suspended awaiting reply");
        match rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(fault)) => Err(CallError::Fault(fault)),
            Err(_) => Err(CallError::SystemShutDown),
        }
    }

    async fn receive_loop(system: ActorSystem, mut inbox: mpsc::UnboundedReceiver<Inbound>) {
        while let Some(Inbound { from, frame }) = inbox.recv().await {
            trace!(tag = frame.tag(), "processing inbound frame");
            match frame {
                Frame::ProcessReady => system.handle_process_ready(from),
                Frame::Initialize(name) => system.handle_initialize(from, name),
                Frame::RemoteCall(envelope) => system.handle_inbound_call(from, envelope),
                Frame::Reply(envelope) => system.handle_inbound_reply(envelope),
            }
        }
        debug!("inbox closed; receive loop exiting");
    }

    fn handle_process_ready(&self, from: Peer) {
        match from {
            Peer::Worker(name) => {
                let mut state = self.inner.state.lock();
                match state.workers.get_mut(&name) {
                    Some(handle) => handle.set_ready(true),
                    None => warn!(worker = %name, "readiness announcement from unknown worker"),
                }
            }
            Peer::Host => warn!("unexpected processReady from host; dropping"),
        }
    }

    fn handle_initialize(&self, from: Peer, name: ActorName) {
        if from != Peer::Host {
            warn!(actor = %name, "initialize from a worker; dropping");
            return;
        }
        info!(actor = %name, "initializing hosted actor");
        if !self.inner.types.construct(name.as_str(), self) {
            error!(
                actor = %name,
                "initialize names an actor type with no registered factory; dropping"
            );
        }
    }

    fn handle_inbound_call(&self, from: Peer, envelope: CallEnvelope) {
        let managed = {
            let mut state = self.inner.state.lock();
            match state.managed.get(&envelope.recipient) {
                Some(managed) => managed.clone(),
                None => {
                    debug!(
                        call_id = %envelope.call_id,
                        recipient = %envelope.recipient,
                        "recipient not registered; dead-lettering call"
                    );
                    state.dead_letters.push_back((from, envelope));
                    self.inner.metrics.record_dead_letter_queued();
                    return;
                }
            }
        };
        self.spawn_invocation(from, envelope, managed);
    }

    /// Run one invocation as a detached task. Failures resolve the caller
    /// through the reply fault channel; the loop never awaits them.
    fn spawn_invocation(&self, origin: Peer, envelope: CallEnvelope, managed: ManagedActor) {
        let system = self.clone();
        tokio::spawn(async move {
            let CallEnvelope {
                call_id,
                recipient,
                target,
                generic_subs,
                args,
            } = envelope;

            let decoder = CallDecoder::new(args, generic_subs);
            let payload = match managed.invoke(&target, decoder).await {
                Ok(value) => ReplyPayload::Return(value),
                Err(fault) => {
                    error!(
                        %call_id,
                        actor = %recipient,
                        method = %target,
                        fault = %fault,
                        "remote invocation failed"
                    );
                    system.inner.metrics.record_fault_returned();
                    ReplyPayload::Fault(fault)
                }
            };

            let reply = ReplyEnvelope {
                call_id,
                sender: Some(recipient),
                payload,
            };
            system.post_reply(origin, reply);
        });
    }

    fn post_reply(&self, to: Peer, reply: ReplyEnvelope) {
        match to {
            Peer::Host => match &self.inner.host {
                Some(port) => {
                    if let Err(e) = port.post(Frame::Reply(reply), Vec::new()) {
                        warn!(error = %e, "failed to post reply to host");
                    }
                }
                None => warn!("reply destined for host, but this system has no host port"),
            },
            Peer::Worker(name) => {
                let mut state = self.inner.state.lock();
                match state.workers.get_mut(&name) {
                    Some(handle) => handle.post(Frame::Reply(reply), Vec::new()),
                    None => warn!(worker = %name, "reply destined for unknown worker; dropping"),
                }
            }
        }
    }

    fn handle_inbound_reply(&self, envelope: ReplyEnvelope) {
        let entry = self.inner.state.lock().pending.remove(&envelope.call_id);
        match entry {
            Some(tx) => {
                self.inner.metrics.record_reply_matched();
                let outcome = match envelope.payload {
                    ReplyPayload::Return(value) => Ok(value),
                    ReplyPayload::Fault(fault) => Err(fault),
                };
                // The caller may have given up and dropped its receiver.
                let _ = tx.send(outcome);
            }
            None => {
                debug!(
                    call_id = %envelope.call_id,
                    "discarding reply with no pending call"
                );
                self.inner.metrics.record_reply_discarded();
            }
        }
    }

    pub(crate) fn inbound_sender(&self) -> mpsc::UnboundedSender<Inbound> {
        self.inner.inbox.clone()
    }
}

impl std::fmt::Debug for ActorSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ActorSystem")
            .field("system_id", &self.inner.system_id)
            .field("managed", &state.managed.len())
            .field("workers", &state.workers.len())
            .field("pending", &state.pending.len())
            .field("dead_letters", &state.dead_letters.len())
            .finish()
    }
}

enum RefKind<A: WorkerActor> {
    Local {
        instance: Arc<AsyncMutex<A>>,
        managed: ManagedActor,
    },
    Remote {
        system: ActorSystem,
    },
}

/// Location-transparent reference to an actor
pub struct ActorRef<A: WorkerActor> {
    name: ActorName,
    kind: RefKind<A>,
}

impl<A: WorkerActor> ActorRef<A> {
    pub fn name(&self) -> &ActorName {
        &self.name
    }

    pub fn is_local(&self) -> bool {
        matches!(self.kind, RefKind::Local { .. })
    }

    /// Direct access to the instance when it runs in this process
    pub fn local(&self) -> Option<Arc<AsyncMutex<A>>> {
        match &self.kind {
            RefKind::Local { instance, .. } => Some(Arc::clone(instance)),
            RefKind::Remote { .. } => None,
        }
    }

    /// Invoke a method by identifier.
    ///
    /// Local references dispatch straight through the method table — no
    /// envelope, no round trip. Remote references build a call envelope,
    /// suspend until the matching reply arrives, and decode the returned
    /// value (or surface the typed fault).
    pub async fn invoke<R: DeserializeOwned + 'static>(
        &self,
        target: &str,
        call: CallEncoder,
    ) -> Result<R, CallError> {
        let value = match &self.kind {
            RefKind::Local { managed, .. } => {
                let (generic_subs, args, _transfer) = call.into_parts();
                managed
                    .invoke(target, CallDecoder::new(args, generic_subs))
                    .await
                    .map_err(CallError::Fault)?
            }
            RefKind::Remote { system } => {
                system.call_remote(self.name.clone(), target, call).await?
            }
        };

        from_wire(value.unwrap_or(WireValue::Null)).map_err(CallError::ReplyDecode)
    }
}

impl<A: WorkerActor> Clone for ActorRef<A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            kind: match &self.kind {
                RefKind::Local { instance, managed } => RefKind::Local {
                    instance: Arc::clone(instance),
                    managed: managed.clone(),
                },
                RefKind::Remote { system } => RefKind::Remote {
                    system: system.clone(),
                },
            },
        }
    }
}

impl<A: WorkerActor> std::fmt::Debug for ActorRef<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorRef")
            .field("name", &self.name)
            .field("local", &self.is_local())
            .finish()
    }
}

//! Worker-Actor Dispatch
//!
//! Lets application code invoke methods on actors living in isolated
//! worker processes as if the calls were local. There is no shared
//! memory between caller and callee: every call crosses an asynchronous,
//! message-only boundary as a structured envelope, and every reply is
//! correlated back to its originating call.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐        ┌──────────────────────────┐
//! │   ActorSystem (host)     │        │   ActorSystem (worker)   │
//! │                          │        │                          │
//! │  resolve::<Counter>() ───┼─ init ─┼─▶ registry constructs    │
//! │                          │        │   Counter, registers it  │
//! │  ref.invoke("increment") │        │                          │
//! │    │ CallEnvelope        │        │  method table dispatch   │
//! │    ▼                     │        │    │                     │
//! │  WorkerHandle ───────────┼─ call ─┼─▶  invoke, encode reply  │
//! │  (queues until ready)    │        │    │                     │
//! │                          │◀─reply─┼────┘                     │
//! │  pending table resolves  │        │                          │
//! │  the suspended caller    │        │                          │
//! └──────────────────────────┘        └──────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use worker_actors::{
//!     ActorSystem, CallEncoder, InProcessLauncher, MethodTable, SystemConfig, WorkerActor,
//! };
//!
//! struct Counter { value: i64 }
//!
//! impl WorkerActor for Counter {
//!     fn type_name() -> &'static str { "Counter" }
//!     fn create(_system: &ActorSystem) -> Self { Counter { value: 0 } }
//!     fn methods(table: &mut MethodTable<Self>) {
//!         table.method("increment", |actor, mut args| async move {
//!             let amount: i64 = args.next()?;
//!             let mut counter = actor.lock().await;
//!             counter.value += amount;
//!             Ok(counter.value)
//!         });
//!     }
//! }
//!
//! fn worker_config() -> SystemConfig {
//!     SystemConfig::new(InProcessLauncher::new(worker_config)).host_type::<Counter>()
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let system = ActorSystem::new(worker_config());
//! let counter = system.resolve::<Counter>()?;
//! let value: i64 = counter.invoke("increment", CallEncoder::new().arg(&5i64)?).await?;
//! assert_eq!(value, 5);
//! # Ok(())
//! # }
//! ```

pub mod actor;
pub mod error;
pub mod handle;
pub mod launch;
pub mod local;
pub mod metrics;
pub mod process;
pub mod registry;
pub mod system;

pub use actor::{CallDecoder, CallEncoder, MethodTable, WorkerActor};
pub use error::{CallError, LaunchError, PortError, ResolveError};
pub use handle::WorkerHandle;
pub use launch::{EntryPoint, MessagePort, WorkerLauncher, ENTRY_ENV};
pub use local::InProcessLauncher;
pub use metrics::{DispatchMetrics, DispatchStats};
pub use process::{is_worker_invocation, worker_main, ChildProcessLauncher, WORKER_FLAG};
pub use registry::ActorTypeRegistry;
pub use system::{ActorRef, ActorSystem, Peer, SystemConfig};

// Protocol surface that appears in this crate's signatures
pub use protocol::{
    ActorName, CallEnvelope, CallFault, CallId, Frame, ReplyEnvelope, ReplyPayload, TransferList,
};
pub use wire::{from_wire, to_wire, CodecError, WireValue};

//! Actor model: typed method dispatch over the envelope protocol
//!
//! An actor type declares its stable name, an optional worker entry
//! point, a constructor, and a [`MethodTable`] mapping method identifiers
//! to typed invocation closures. The table is built once, at
//! registration time; inbound calls are dispatched through it without any
//! runtime type-name reflection.

use crate::system::ActorSystem;
use futures::future::BoxFuture;
use protocol::{CallFault, TransferList};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use wire::{from_wire, to_wire, CodecError, WireValue};

/// An actor hosted behind the process boundary.
///
/// One instance exists per type and process (singleton addressing): the
/// identity is derived from [`WorkerActor::type_name`], never from an
/// instance.
pub trait WorkerActor: Send + Sized + 'static {
    /// Stable name this actor is addressed by. Must be unique across the
    /// actor types a deployment registers.
    fn type_name() -> &'static str;

    /// Worker entry point for this actor type. `None` uses the
    /// environment-derived default.
    fn entry_point() -> Option<crate::launch::EntryPoint> {
        None
    }

    /// Construct the instance when a worker is initialized for this type
    fn create(system: &ActorSystem) -> Self;

    /// Register this type's invocable methods
    fn methods(table: &mut MethodTable<Self>);
}

pub(crate) type InvokeFuture = BoxFuture<'static, Result<Option<WireValue>, CallFault>>;

type MethodFn<A> = Box<dyn Fn(Arc<Mutex<A>>, CallDecoder) -> InvokeFuture + Send + Sync>;

/// Dispatch table mapping method identifiers to typed invocation closures
pub struct MethodTable<A> {
    methods: HashMap<&'static str, MethodFn<A>>,
}

impl<A: Send + 'static> MethodTable<A> {
    pub(crate) fn new() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }

    /// Register a method. The closure receives the shared actor instance
    /// and the positional argument decoder; its return value is encoded
    /// into the reply (unit returns produce an empty reply value).
    pub fn method<F, Fut, R>(&mut self, name: &'static str, f: F)
    where
        F: Fn(Arc<Mutex<A>>, CallDecoder) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, CallFault>> + Send + 'static,
        R: Serialize + Send + 'static,
    {
        self.methods.insert(
            name,
            Box::new(move |actor, args| {
                let fut = f(actor, args);
                Box::pin(async move {
                    let ret = fut.await?;
                    if TypeId::of::<R>() == TypeId::of::<()>() {
                        return Ok(None);
                    }
                    Ok(Some(to_wire(&ret).map_err(CallFault::from)?))
                })
            }),
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// A locally running actor instance plus its type-erased dispatch entry
#[derive(Clone)]
pub(crate) struct ManagedActor {
    instance: Arc<dyn Any + Send + Sync>,
    invoke: Arc<dyn Fn(&str, CallDecoder) -> InvokeFuture + Send + Sync>,
}

impl ManagedActor {
    pub(crate) fn from_actor<A: WorkerActor>(actor: A) -> Self {
        let mut table = MethodTable::new();
        A::methods(&mut table);
        let table = Arc::new(table);

        let instance = Arc::new(Mutex::new(actor));
        let shared = Arc::clone(&instance);

        let invoke = Arc::new(move |target: &str, args: CallDecoder| -> InvokeFuture {
            match table.methods.get(target) {
                Some(method) => method(Arc::clone(&shared), args),
                None => {
                    let fault = CallFault::new(
                        "unknownMethod",
                        format!("{} has no method {target}", A::type_name()),
                    );
                    Box::pin(async move { Err(fault) })
                }
            }
        });

        Self {
            instance: instance as Arc<dyn Any + Send + Sync>,
            invoke,
        }
    }

    pub(crate) fn invoke(&self, target: &str, args: CallDecoder) -> InvokeFuture {
        (self.invoke)(target, args)
    }

    /// Typed access to the underlying instance. `None` when the
    /// registered type differs from `A`.
    pub(crate) fn typed<A: WorkerActor>(&self) -> Option<Arc<Mutex<A>>> {
        Arc::clone(&self.instance).downcast::<Mutex<A>>().ok()
    }
}

/// Records one outbound invocation: generic substitutions, encoded
/// arguments, and buffers to transfer
#[derive(Default)]
pub struct CallEncoder {
    generic_subs: Vec<String>,
    args: Vec<WireValue>,
    transfer: TransferList,
}

impl CallEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode and append one positional argument
    pub fn arg<T: Serialize + 'static>(mut self, value: &T) -> Result<Self, CodecError> {
        self.args.push(to_wire(value)?);
        Ok(self)
    }

    /// Record a type name substituted for a generic parameter
    pub fn generic_sub(mut self, type_name: impl Into<String>) -> Self {
        self.generic_subs.push(type_name.into());
        self
    }

    /// Add a buffer to hand over without copying
    pub fn transfer(mut self, buf: bytes::Bytes) -> Self {
        self.transfer.push(buf);
        self
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Vec<WireValue>, TransferList) {
        (self.generic_subs, self.args, self.transfer)
    }
}

/// Positional argument decoder handed to method closures
pub struct CallDecoder {
    args: std::vec::IntoIter<WireValue>,
    generic_subs: Vec<String>,
}

impl CallDecoder {
    pub(crate) fn new(args: Vec<WireValue>, generic_subs: Vec<String>) -> Self {
        Self {
            args: args.into_iter(),
            generic_subs,
        }
    }

    /// Decode the next argument as `T`. Exhausting the list is a decode
    /// error, not a panic.
    pub fn next<T: DeserializeOwned>(&mut self) -> Result<T, CodecError> {
        let value = self.args.next().ok_or(CodecError::ArgumentsExhausted {
            expected: std::any::type_name::<T>(),
        })?;
        from_wire(value)
    }

    /// Next argument in raw structured form
    pub fn next_raw(&mut self) -> Option<WireValue> {
        self.args.next()
    }

    /// Type names substituted for the target's generic parameters
    pub fn generic_subs(&self) -> &[String] {
        &self.generic_subs
    }

    pub fn remaining(&self) -> usize {
        self.args.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

            table.method("reset", |actor, _args| async move {
                actor.lock().await.value = 0;
                Ok(())
            });
        }
    }

    fn decoder_for(args: Vec<WireValue>) -> CallDecoder {
        CallDecoder::new(args, vec![])
    }

    #[tokio::test]
    async fn table_dispatch_invokes_the_typed_body() {
        let managed = ManagedActor::from_actor(Counter { value: 1 });

        let result = managed
            .invoke("increment", decoder_for(vec![WireValue::Number(5.0)]))
            .await
            .unwrap();
        assert_eq!(result, Some(WireValue::Number(6.0)));
    }

    #[tokio::test]
    async fn unit_returns_produce_no_reply_value() {
        let managed = ManagedActor::from_actor(Counter { value: 9 });

        let result = managed.invoke("reset", decoder_for(vec![])).await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn unknown_method_is_a_fault_not_a_panic() {
        let managed = ManagedActor::from_actor(Counter { value: 0 });

        let fault = managed
            .invoke("decrement", decoder_for(vec![]))
            .await
            .unwrap_err();
        assert_eq!(fault.kind, "unknownMethod");
    }

    #[tokio::test]
    async fn mismatched_argument_faults_with_decode_kind() {
        let managed = ManagedActor::from_actor(Counter { value: 0 });

        let fault = managed
            .invoke(
                "increment",
                decoder_for(vec![WireValue::Text("five".to_string())]),
            )
            .await
            .unwrap_err();
        assert_eq!(fault.kind, "decode");
    }

    #[tokio::test]
    async fn exhausted_arguments_fault_instead_of_hanging() {
        let managed = ManagedActor::from_actor(Counter { value: 0 });

        let fault = managed
            .invoke("increment", decoder_for(vec![]))
            .await
            .unwrap_err();
        assert_eq!(fault.kind, "decode");
    }

    #[test]
    fn encoder_records_arguments_in_order() {
        let encoder = CallEncoder::new()
            .arg(&5i64)
            .unwrap()
            .arg(&"tag".to_string())
            .unwrap()
            .generic_sub("Int64");

        let (subs, args, transfer) = encoder.into_parts();
        assert_eq!(subs, vec!["Int64".to_string()]);
        assert_eq!(
            args,
            vec![
                WireValue::Number(5.0),
                WireValue::Text("tag".to_string()),
            ]
        );
        assert!(transfer.is_empty());
    }

    #[test]
    fn decoder_exposes_generic_subs() {
        let mut decoder = CallDecoder::new(
            vec![WireValue::Number(1.0)],
            vec!["Float64".to_string()],
        );
        assert_eq!(decoder.generic_subs(), ["Float64".to_string()]);
        assert_eq!(decoder.remaining(), 1);
        let _: f64 = decoder.next().unwrap();
        assert_eq!(decoder.remaining(), 0);
    }
}

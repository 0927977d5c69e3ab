//! Actor type registry
//!
//! Explicit startup-time map from actor type name to a
//! construct-and-register closure. A worker process registers the actor
//! types it can host before serving traffic; an `initialize` frame then
//! selects one by name. No runtime type reflection is involved.

use crate::actor::WorkerActor;
use crate::system::ActorSystem;
use std::collections::HashMap;
use tracing::debug;

type ConstructFn = Box<dyn Fn(&ActorSystem) + Send + Sync>;

/// Registry of constructible actor types
#[derive(Default)]
pub struct ActorTypeRegistry {
    factories: HashMap<&'static str, ConstructFn>,
}

impl ActorTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `A` constructible by name. Registering the same type twice
    /// replaces the earlier factory.
    pub fn register<A: WorkerActor>(&mut self) -> &mut Self {
        debug!(actor_type = A::type_name(), "registering constructible actor type");
        self.factories.insert(
            A::type_name(),
            Box::new(|system| {
                let actor = A::create(system);
                system.register(actor);
            }),
        );
        self
    }

    /// Construct and register the named actor on `system`. Returns false
    /// when the name has no registered factory.
    pub(crate) fn construct(&self, type_name: &str, system: &ActorSystem) -> bool {
        match self.factories.get(type_name) {
            Some(factory) => {
                factory(system);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for ActorTypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorTypeRegistry")
            .field("types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

//! Actor identity
//!
//! An [`ActorName`] is the stable, serializable address of an actor. One
//! identity exists per actor type (singleton policy): the name is derived
//! from the declared type, never from an instance. Identities are created
//! once and live for the process lifetime.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Globally comparable, serializable actor address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorName {
    type_name: String,
}

impl ActorName {
    /// Derive the singleton identity for a declared type name.
    /// Deterministic: the same type name always yields an equal identity.
    pub fn for_type(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.type_name
    }
}

impl fmt::Display for ActorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn identities_compare_by_wrapped_name() {
        let a = ActorName::for_type("Counter");
        let b = ActorName::for_type("Counter");
        let c = ActorName::for_type("Ledger");

        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut map = HashMap::new();
        map.insert(a, 1);
        assert_eq!(map.get(&b), Some(&1));
    }

    #[test]
    fn identity_survives_serialization() {
        let name = ActorName::for_type("Counter");
        let bytes = bincode::serialize(&name).unwrap();
        let back: ActorName = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, name);
        assert_eq!(back.as_str(), "Counter");
    }
}

//! Core [`Component`] trait and def-type hashing.
//!
//! Every piece of schema-described data handled by the blueprint machinery
//! must implement [`Component`]. Records are serialised as self-describing
//! MessagePack maps, so the trait requires `Serialize + Deserialize`.
//!
//! ## Def Types
//!
//! [`ComponentTypeId`] is the "def type" of a record: the FNV-1a 64-bit hash
//! of the component's schema name. It is the only type information that
//! survives serialisation, and it is what the entity factory uses to route a
//! record to the System that owns it.

use serde::{Deserialize, Serialize};

/// FNV-1a 64-bit offset basis.
const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

/// FNV-1a 64-bit prime.
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Hash a string with FNV-1a 64-bit.
///
/// ```text
/// hash = 0xcbf29ce484222325
/// for each byte in name.as_bytes():
///     hash = hash XOR byte
///     hash = hash * 0x00000100000001b3
/// ```
#[must_use]
pub const fn fnv1a(name: &str) -> u64 {
    let bytes = name.as_bytes();
    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// The def type of a component record, derived from its schema name using
/// the FNV-1a 64-bit hash algorithm.
///
/// The value is deterministic and language-neutral, which is what lets data
/// written by offline tools be matched against native Rust types at load
/// time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ComponentTypeId(pub u64);

impl ComponentTypeId {
    /// The "no type" def type. Never produced by [`ComponentTypeId::of`] for
    /// a real schema name in practice.
    pub const NONE: ComponentTypeId = ComponentTypeId(0);

    /// Compute the def type from a schema name.
    #[must_use]
    pub const fn from_name(name: &str) -> Self {
        Self(fnv1a(name))
    }

    /// Compute the def type for a Rust component type `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self::from_name(T::type_name())
    }
}

impl std::fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// The core component trait.
///
/// # Examples
///
/// ```rust
/// use serde::{Serialize, Deserialize};
/// use engine_component::Component;
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct NameDef {
///     name: String,
/// }
///
/// impl Component for NameDef {
///     fn type_name() -> &'static str { "NameDef" }
/// }
/// ```
pub trait Component: Send + Sync + 'static + Serialize + for<'de> Deserialize<'de> {
    /// The schema name of this component type.
    fn type_name() -> &'static str;

    /// Returns the def type for this component.
    fn component_type_id() -> ComponentTypeId {
        ComponentTypeId::from_name(Self::type_name())
    }

    /// Serialise this value into a standalone MessagePack record.
    ///
    /// # Errors
    ///
    /// Returns the encoder error if the value cannot be represented.
    fn to_record(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec_named(self)
    }

    /// Deserialise a value from a MessagePack record.
    ///
    /// # Errors
    ///
    /// Returns the decoder error if `bytes` is not a valid record of this type.
    fn from_record(bytes: &[u8]) -> Result<Self, rmp_serde::decode::Error> {
        rmp_serde::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
    struct NameDef {
        name: String,
    }

    impl Component for NameDef {
        fn type_name() -> &'static str {
            "NameDef"
        }
    }

    #[test]
    fn test_component_type_id_matches_from_name() {
        assert_eq!(NameDef::component_type_id(), ComponentTypeId::from_name("NameDef"));
        assert_eq!(ComponentTypeId::of::<NameDef>(), ComponentTypeId::from_name("NameDef"));
    }

    #[test]
    fn test_component_type_id_differs_between_names() {
        assert_ne!(
            ComponentTypeId::from_name("NameDef"),
            ComponentTypeId::from_name("TransformDef")
        );
    }

    #[test]
    fn test_fnv1a_known_vectors() {
        // FNV-1a 64-bit of empty string is the offset basis itself.
        assert_eq!(fnv1a(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a("a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_record_roundtrip() {
        let name = NameDef {
            name: "hello".to_string(),
        };
        let bytes = name.to_record().unwrap();
        assert_eq!(NameDef::from_record(&bytes).unwrap(), name);
    }

    #[test]
    fn test_from_record_rejects_garbage() {
        assert!(NameDef::from_record(&[0xc1]).is_err());
    }
}

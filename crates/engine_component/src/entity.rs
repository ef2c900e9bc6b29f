//! Entity type and allocation utilities.
//!
//! An [`Entity`] is a lightweight `u64` identifier with no inherent data.
//! Component data lives in the Systems that own it.

use serde::{Deserialize, Serialize};

/// A unique entity identifier. `0` is reserved as the null entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity(pub u64);

impl Entity {
    /// The null / invalid entity sentinel.
    pub const INVALID: Entity = Entity(0);

    /// Create an entity from a raw `u64` identifier.
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` identifier.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }

    /// Returns `true` if this is a valid (non-zero) entity.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Allocates monotonically increasing entity IDs.
///
/// IDs are never recycled. Running out of IDs is an unrecoverable invariant
/// violation and panics.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    last_id: u64,
}

impl EntityAllocator {
    /// Creates a new allocator. IDs start at 1 (0 is reserved for [`Entity::INVALID`]).
    #[must_use]
    pub fn new() -> Self {
        Self { last_id: 0 }
    }

    /// Creates an allocator whose next ID is `last_id + 1`.
    #[must_use]
    pub fn starting_after(last_id: u64) -> Self {
        Self { last_id }
    }

    /// Allocates a fresh entity ID.
    ///
    /// # Panics
    ///
    /// Panics if the counter would wrap back to the null entity.
    pub fn allocate(&mut self) -> Entity {
        let Some(id) = self.last_id.checked_add(1) else {
            panic!("overflow on entity generation");
        };
        self.last_id = id;
        Entity(id)
    }

    /// Returns the number of entities allocated so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.last_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_creation() {
        let e = Entity::from_raw(42);
        assert_eq!(e.id(), 42);
        assert!(e.is_valid());
    }

    #[test]
    fn test_entity_invalid() {
        assert!(!Entity::INVALID.is_valid());
        assert_eq!(Entity::INVALID.id(), 0);
    }

    #[test]
    fn test_allocator_produces_unique_ids() {
        let mut alloc = EntityAllocator::new();
        let e1 = alloc.allocate();
        let e2 = alloc.allocate();
        let e3 = alloc.allocate();
        assert_eq!(e1.id(), 1);
        assert_eq!(e2.id(), 2);
        assert_eq!(e3.id(), 3);
        assert_eq!(alloc.count(), 3);
    }

    #[test]
    fn test_allocator_reaches_max_id() {
        let mut alloc = EntityAllocator::starting_after(u64::MAX - 1);
        assert_eq!(alloc.allocate(), Entity(u64::MAX));
    }

    #[test]
    #[should_panic(expected = "overflow on entity generation")]
    fn test_allocator_overflow_panics() {
        let mut alloc = EntityAllocator::starting_after(u64::MAX);
        let _ = alloc.allocate();
    }

    #[test]
    fn test_entity_serialization_roundtrip() {
        let entity = Entity::from_raw(999);
        let bytes = rmp_serde::to_vec(&entity).unwrap();
        let restored: Entity = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(entity, restored);
    }
}

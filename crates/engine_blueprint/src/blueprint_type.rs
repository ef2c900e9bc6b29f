//! Type tags for blueprint records.
//!
//! A record's type is known either natively (a Rust type was written into
//! the blueprint) or only by its def-type hash (the record came off the wire
//! before any Rust type was involved). [`BlueprintType`] models both and
//! decides "is this record a `T`?" for either representation.

use std::any::TypeId;

use engine_component::{Component, ComponentTypeId};

/// Identifies the type of one blueprint record.
#[derive(Debug, Clone, Copy)]
pub enum BlueprintType {
    /// A record written from a native Rust value.
    Typed {
        id: TypeId,
        def_type: ComponentTypeId,
    },
    /// A record known only by the hash of its schema name.
    NameOnly(ComponentTypeId),
}

impl BlueprintType {
    /// The tag for a native component type.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self::Typed {
            id: TypeId::of::<T>(),
            def_type: T::component_type_id(),
        }
    }

    /// A tag carrying only a def-type hash.
    #[must_use]
    pub const fn from_def_type(def_type: ComponentTypeId) -> Self {
        Self::NameOnly(def_type)
    }

    /// The def-type hash, available for both representations.
    #[must_use]
    pub const fn def_type(&self) -> ComponentTypeId {
        match *self {
            Self::Typed { def_type, .. } | Self::NameOnly(def_type) => def_type,
        }
    }

    /// Returns `true` if this tag names the component type `T`.
    ///
    /// Native tags compare by [`TypeId`]; hash-only tags compare by def type.
    #[must_use]
    pub fn is<T: Component>(&self) -> bool {
        match *self {
            Self::Typed { id, .. } => id == TypeId::of::<T>(),
            Self::NameOnly(def_type) => def_type == T::component_type_id(),
        }
    }

    /// Compatibility rule between two tags: when both sides are native the
    /// [`TypeId`]s decide, otherwise the def-type hashes do.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Typed { id: a, .. }, Self::Typed { id: b, .. }) => a == b,
            _ => self.def_type() == other.def_type(),
        }
    }
}

impl PartialEq for BlueprintType {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other)
    }
}

impl Default for BlueprintType {
    fn default() -> Self {
        Self::NameOnly(ComponentTypeId::NONE)
    }
}

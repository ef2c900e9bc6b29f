//! Per-def-type handlers used to canonically re-serialise records.
//!
//! A serialised record can only be decoded by code that knows its native
//! type. [`ComponentHandlers`] maps def types to type-erased
//! decode/encode functions so a [`BlueprintWriter`](crate::BlueprintWriter)
//! can round-trip records it has never seen the Rust type of.

use std::any::Any;
use std::collections::HashMap;

use engine_component::{Component, ComponentTypeId};

use crate::blueprint::encode_native;
use crate::error::BlueprintError;

/// A decoded record of some registered component type.
pub type NativeVariant = Box<dyn Any + Send + Sync>;

type ReadFromTableFn = fn(&[u8]) -> Result<NativeVariant, BlueprintError>;
type WriteToBufferFn = fn(&dyn Any) -> Result<Vec<u8>, BlueprintError>;

fn read_from_table<T: Component>(record: &[u8]) -> Result<NativeVariant, BlueprintError> {
    Ok(Box::new(T::from_record(record)?))
}

struct ComponentHandler {
    name: &'static str,
    read_from_table: ReadFromTableFn,
    write_to_buffer: WriteToBufferFn,
}

/// Registry of component handlers, keyed by def type.
#[derive(Default)]
pub struct ComponentHandlers {
    handlers: HashMap<ComponentTypeId, ComponentHandler>,
}

impl ComponentHandlers {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the component type `T` under its def type. Registering the
    /// same def type again replaces the earlier handler.
    pub fn register<T: Component>(&mut self) {
        self.handlers.insert(
            T::component_type_id(),
            ComponentHandler {
                name: T::type_name(),
                read_from_table: read_from_table::<T>,
                write_to_buffer: encode_native::<T>,
            },
        );
    }

    /// Returns `true` if a handler exists for `def_type`.
    #[must_use]
    pub fn is_registered(&self, def_type: ComponentTypeId) -> bool {
        self.handlers.contains_key(&def_type)
    }

    /// Schema name registered for `def_type`.
    #[must_use]
    pub fn name(&self, def_type: ComponentTypeId) -> Option<&'static str> {
        self.handlers.get(&def_type).map(|handler| handler.name)
    }

    /// Decode a serialised record into its native type.
    ///
    /// # Errors
    ///
    /// Returns [`BlueprintError::UnregisteredType`] if no handler exists and
    /// [`BlueprintError::Decode`] if `record` is malformed.
    pub fn read_from_table(
        &self,
        def_type: ComponentTypeId,
        record: &[u8],
    ) -> Result<NativeVariant, BlueprintError> {
        let handler = self.handler(def_type)?;
        (handler.read_from_table)(record)
    }

    /// Serialise a native object of the type registered for `def_type`.
    ///
    /// # Errors
    ///
    /// Returns [`BlueprintError::UnregisteredType`] if no handler exists and
    /// [`BlueprintError::TypeMismatch`] if `object` is of another type.
    pub fn write_to_buffer(
        &self,
        def_type: ComponentTypeId,
        object: &dyn Any,
    ) -> Result<Vec<u8>, BlueprintError> {
        let handler = self.handler(def_type)?;
        (handler.write_to_buffer)(object)
    }

    /// Decode and re-encode a record, producing its canonical encoding.
    ///
    /// # Errors
    ///
    /// See [`ComponentHandlers::read_from_table`].
    pub fn canonicalize(
        &self,
        def_type: ComponentTypeId,
        record: &[u8],
    ) -> Result<Vec<u8>, BlueprintError> {
        let native = self.read_from_table(def_type, record)?;
        let object: &dyn Any = &*native;
        self.write_to_buffer(def_type, object)
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    fn handler(&self, def_type: ComponentTypeId) -> Result<&ComponentHandler, BlueprintError> {
        self.handlers
            .get(&def_type)
            .ok_or(BlueprintError::UnregisteredType(def_type))
    }
}

impl std::fmt::Debug for ComponentHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set()
            .entries(self.handlers.values().map(|handler| handler.name))
            .finish()
    }
}

//! Blueprints are used by Systems to read and write component state.
//!
//! Systems describe their component data with schema types (anything
//! implementing [`Component`]). During "create" a System reads such a value
//! out of a [`Blueprint`]; during "save" it writes one in. The blueprint hides
//! whether the value is held natively, serialised in its own buffer, or
//! borrowed from somebody else's serialised data.
//!
//! A blueprint is either in write mode or read mode. It starts in write mode
//! when created empty and switches to read mode on [`Blueprint::finish_writing`]
//! or on the first [`Blueprint::for_each_component`]; it never switches back.
//!
//! A blueprint stores several records but exposes one at a time through a
//! cursor. There is no random access: [`Blueprint::for_each_component`] walks
//! the records in order, and each call restarts from the first record.
//!
//! ```rust
//! use engine_blueprint::Blueprint;
//! use engine_component::Component;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct NameDef {
//!     name: String,
//! }
//!
//! impl Component for NameDef {
//!     fn type_name() -> &'static str { "NameDef" }
//! }
//!
//! let mut blueprint = Blueprint::new();
//! blueprint.write(&NameDef { name: "hello".into() }).unwrap();
//! blueprint.for_each_component(|record| {
//!     assert_eq!(record.read::<NameDef>().unwrap().name, "hello");
//! });
//! ```

use std::any::Any;
use std::ops::Range;

use engine_component::{Component, ComponentTypeId};
use tracing::error;

use crate::blueprint_type::BlueprintType;
use crate::error::BlueprintError;

/// Default initial byte capacity of a blueprint's record buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 256;

/// A serialised record identified only by its def type.
pub type TypedRecord<'a> = (ComponentTypeId, &'a [u8]);

/// Supplies the record at an index from caller-owned data.
pub type ArrayAccessorFn<'a> = Box<dyn Fn(usize) -> Option<TypedRecord<'a>> + 'a>;

type EncodeNativeFn = fn(&dyn Any) -> Result<Vec<u8>, BlueprintError>;

pub(crate) fn encode_native<T: Component>(object: &dyn Any) -> Result<Vec<u8>, BlueprintError> {
    let value = object
        .downcast_ref::<T>()
        .ok_or(BlueprintError::TypeMismatch {
            requested: T::type_name(),
            current: T::component_type_id(),
        })?;
    Ok(value.to_record()?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Read,
    Write,
}

/// Directory entry for one record in a [`RecordBuffer`].
#[derive(Debug, Clone)]
struct Entry {
    ty: BlueprintType,
    range: Range<usize>,
}

/// Records written through [`Blueprint::write`]: a directory plus the
/// concatenated payloads.
#[derive(Debug)]
struct RecordBuffer {
    directory: Vec<Entry>,
    payload: Vec<u8>,
}

impl RecordBuffer {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            directory: Vec::new(),
            payload: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, ty: BlueprintType, record: &[u8]) {
        let start = self.payload.len();
        self.payload.extend_from_slice(record);
        self.directory.push(Entry {
            ty,
            range: start..self.payload.len(),
        });
    }
}

/// Where the records of a blueprint live. Fixed at construction.
enum Backing<'a> {
    /// Records written into the blueprint itself. Allocated on first write.
    Buffer(Option<RecordBuffer>),
    /// A single native object, serialised only on demand.
    Native {
        object: &'a dyn Any,
        ty: BlueprintType,
        encode: EncodeNativeFn,
        materialized: Option<Vec<u8>>,
    },
    /// Records pulled lazily from caller-owned data.
    Accessor(ArrayAccessorFn<'a>),
}

/// What the cursor currently points at.
#[derive(Debug, Clone, Default)]
enum Source<'a> {
    #[default]
    None,
    Native,
    Buffered(Range<usize>),
    External(&'a [u8]),
}

#[derive(Debug, Clone, Default)]
struct Current<'a> {
    ty: BlueprintType,
    source: Source<'a>,
}

/// A dual-mode cursor over one or more component records.
pub struct Blueprint<'a> {
    backing: Backing<'a>,
    current: Current<'a>,
    mode: Mode,
    index: usize,
    count: usize,
    capacity: usize,
}

impl<'a> Blueprint<'a> {
    /// Creates an empty blueprint in write mode.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_CAPACITY)
    }

    /// Creates an empty blueprint whose buffer, once allocated, starts with
    /// `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            backing: Backing::Buffer(None),
            current: Current::default(),
            mode: Mode::Write,
            index: 0,
            count: 0,
            capacity,
        }
    }

    /// Wraps a single native object without copying it. The blueprint is
    /// read-only.
    #[must_use]
    pub fn from_object<T: Component>(object: &'a T) -> Self {
        let ty = BlueprintType::of::<T>();
        let mut blueprint = Self {
            backing: Backing::Native {
                object,
                ty,
                encode: encode_native::<T>,
                materialized: None,
            },
            current: Current::default(),
            mode: Mode::Read,
            index: 0,
            count: 1,
            capacity: DEFAULT_BUFFER_CAPACITY,
        };
        blueprint.prepare();
        blueprint
    }

    /// Iterates `count` records supplied by `accessor`, which is called with
    /// each index in turn. The blueprint is read-only and never copies the
    /// records.
    #[must_use]
    pub fn from_accessor<F>(accessor: F, count: usize) -> Self
    where
        F: Fn(usize) -> Option<TypedRecord<'a>> + 'a,
    {
        let mut blueprint = Self {
            backing: Backing::Accessor(Box::new(accessor)),
            current: Current::default(),
            mode: Mode::Read,
            index: 0,
            count,
            capacity: DEFAULT_BUFFER_CAPACITY,
        };
        blueprint.prepare();
        blueprint
    }

    /// Serialises `value` and appends it to the blueprint.
    ///
    /// # Errors
    ///
    /// Returns [`BlueprintError::NotWritable`] once the blueprint is in read
    /// mode, or [`BlueprintError::Encode`] if `value` cannot be serialised.
    pub fn write<T: Component>(&mut self, value: &T) -> Result<(), BlueprintError> {
        if self.mode != Mode::Write {
            error!(type_name = T::type_name(), "must be in write mode to write");
            return Err(BlueprintError::NotWritable);
        }
        let capacity = self.capacity;
        let Backing::Buffer(buffer) = &mut self.backing else {
            return Err(BlueprintError::NotWritable);
        };
        let record = value.to_record()?;
        buffer
            .get_or_insert_with(|| RecordBuffer::with_capacity(capacity))
            .push(BlueprintType::of::<T>(), &record);
        self.count += 1;
        Ok(())
    }

    /// Switches to read mode and rewinds the cursor to the first record.
    pub fn finish_writing(&mut self) {
        self.mode = Mode::Read;
        self.index = 0;
        self.prepare();
    }

    /// Returns `true` if the current record is a `T`.
    #[must_use]
    pub fn is<T: Component>(&self) -> bool {
        self.current.ty.is::<T>()
    }

    /// The type tag of the current record.
    #[must_use]
    pub fn current_type(&self) -> BlueprintType {
        self.current.ty
    }

    /// Reads the current record as a `T`, logging and returning `None` on
    /// failure.
    #[must_use]
    pub fn read<T: Component + Clone>(&self) -> Option<T> {
        match self.try_read::<T>() {
            Ok(value) => Some(value),
            Err(err) => {
                error!(type_name = T::type_name(), %err, "failed to read blueprint record");
                None
            }
        }
    }

    /// Reads the current record as a `T`.
    ///
    /// # Errors
    ///
    /// Fails if the blueprint is in write mode, if the current record is not
    /// a `T`, if there is no current record, or if the record is malformed.
    pub fn try_read<T: Component + Clone>(&self) -> Result<T, BlueprintError> {
        if self.mode != Mode::Read {
            return Err(BlueprintError::NotReadable);
        }
        if !self.is::<T>() {
            return Err(BlueprintError::TypeMismatch {
                requested: T::type_name(),
                current: self.current.ty.def_type(),
            });
        }
        match &self.current.source {
            Source::Native => self
                .native_object()
                .and_then(|object| object.downcast_ref::<T>())
                .cloned()
                .ok_or(BlueprintError::TypeMismatch {
                    requested: T::type_name(),
                    current: self.current.ty.def_type(),
                }),
            Source::Buffered(_) | Source::External(_) => {
                Ok(T::from_record(self.serialized_record().ok_or(BlueprintError::NoData)?)?)
            }
            Source::None => Err(BlueprintError::NoData),
        }
    }

    /// Calls `f` once per record, in order, starting from the first record.
    /// Switches the blueprint to read mode.
    pub fn for_each_component<F>(&mut self, mut f: F)
    where
        F: FnMut(&Blueprint<'a>),
    {
        self.for_each_component_mut(|blueprint| f(blueprint));
    }

    /// Like [`Blueprint::for_each_component`], but lets `f` call
    /// [`Blueprint::materialize`] on the current record.
    pub fn for_each_component_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut Blueprint<'a>),
    {
        self.finish_writing();
        for _ in 0..self.count {
            f(self);
            self.next();
        }
    }

    /// The def type of the current record.
    #[must_use]
    pub fn legacy_type(&self) -> ComponentTypeId {
        self.current.ty.def_type()
    }

    /// The serialised form of the current record.
    ///
    /// # Errors
    ///
    /// Returns [`BlueprintError::NotMaterialized`] if the record only exists
    /// as a native object (see [`Blueprint::materialize`]) and
    /// [`BlueprintError::NoData`] if there is no current record.
    pub fn legacy_data(&self) -> Result<&[u8], BlueprintError> {
        match &self.current.source {
            Source::Native => match &self.backing {
                Backing::Native {
                    materialized: Some(record),
                    ..
                } => Ok(record),
                _ => Err(BlueprintError::NotMaterialized),
            },
            Source::Buffered(_) | Source::External(_) => {
                self.serialized_record().ok_or(BlueprintError::NoData)
            }
            Source::None => Err(BlueprintError::NoData),
        }
    }

    /// Returns the serialised form of the current record, serialising a
    /// native object first if needed. The result is cached, so later calls
    /// to [`Blueprint::legacy_data`] succeed.
    ///
    /// # Errors
    ///
    /// Returns [`BlueprintError::Encode`] if serialisation fails and
    /// [`BlueprintError::NoData`] if there is no current record.
    pub fn materialize(&mut self) -> Result<&[u8], BlueprintError> {
        if let Source::Native = self.current.source
            && let Backing::Native {
                object,
                encode,
                materialized,
                ..
            } = &mut self.backing
            && materialized.is_none()
        {
            *materialized = Some(encode(*object)?);
        }
        self.legacy_data()
    }

    /// The native object behind the current record, if it has one.
    #[must_use]
    pub fn native_object(&self) -> Option<&'a dyn Any> {
        match (&self.current.source, &self.backing) {
            (Source::Native, Backing::Native { object, .. }) => Some(*object),
            _ => None,
        }
    }

    /// Total number of records.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns `true` if the blueprint holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns `true` once the blueprint has switched to read mode.
    #[must_use]
    pub fn is_reading(&self) -> bool {
        self.mode == Mode::Read
    }

    fn serialized_record(&self) -> Option<&[u8]> {
        match &self.current.source {
            Source::Buffered(range) => match &self.backing {
                Backing::Buffer(Some(buffer)) => buffer.payload.get(range.clone()),
                _ => None,
            },
            Source::External(record) => Some(record),
            Source::None | Source::Native => None,
        }
    }

    /// Loads the record at `index` into `current`.
    fn prepare(&mut self) {
        if self.index >= self.count {
            self.current = Current::default();
            return;
        }
        self.current = match &self.backing {
            Backing::Buffer(Some(buffer)) => match buffer.directory.get(self.index) {
                Some(entry) => Current {
                    ty: entry.ty,
                    source: Source::Buffered(entry.range.clone()),
                },
                None => Current::default(),
            },
            Backing::Buffer(None) => Current::default(),
            Backing::Native { ty, .. } => Current {
                ty: *ty,
                source: Source::Native,
            },
            Backing::Accessor(accessor) => match accessor(self.index) {
                Some((def_type, record)) => Current {
                    ty: BlueprintType::from_def_type(def_type),
                    source: Source::External(record),
                },
                None => Current::default(),
            },
        };
    }

    fn next(&mut self) {
        if self.index < self.count {
            self.index += 1;
            self.prepare();
        }
    }
}

impl Default for Blueprint<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Blueprint<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backing = match &self.backing {
            Backing::Buffer(_) => "buffer",
            Backing::Native { .. } => "native",
            Backing::Accessor(_) => "accessor",
        };
        f.debug_struct("Blueprint")
            .field("backing", &backing)
            .field("mode", &self.mode)
            .field("index", &self.index)
            .field("count", &self.count)
            .field("current", &self.current.ty)
            .finish()
    }
}

//! # engine_blueprint
//!
//! Everything between a component value and the bytes of an entity asset.
//!
//! - [`Blueprint`] — a dual-mode cursor over component records, backed by a
//!   native object, its own buffer, or borrowed serialised data.
//! - [`BlueprintType`] — the type tag of a record.
//! - [`BlueprintTree`] — a blueprint plus ordered children.
//! - [`BlueprintBuilder`] — the stack-based serialiser for the tree format.
//! - [`BlueprintWriter`] — walks a tree and canonically re-serialises it.
//! - [`BlueprintConverter`] — pluggable wire formats, keyed by
//!   [`FileIdentifier`]: [`TreeConverter`] and [`LegacyConverter`].

pub mod blueprint;
pub mod blueprint_type;
pub mod builder;
pub mod codec;
pub mod converter;
pub mod error;
pub mod format;
pub mod handlers;
pub mod legacy;
pub mod tree;
pub mod writer;

pub use blueprint::{ArrayAccessorFn, Blueprint, DEFAULT_BUFFER_CAPACITY, TypedRecord};
pub use blueprint_type::BlueprintType;
pub use builder::BlueprintBuilder;
pub use converter::{BlueprintConverter, TreeConverter};
pub use error::BlueprintError;
pub use format::FileIdentifier;
pub use handlers::{ComponentHandlers, NativeVariant};
pub use legacy::LegacyConverter;
pub use tree::BlueprintTree;
pub use writer::BlueprintWriter;

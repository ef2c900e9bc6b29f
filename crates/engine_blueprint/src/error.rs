//! Blueprint error types.

use engine_component::ComponentTypeId;

use crate::format::FileIdentifier;

/// Errors raised while reading, writing, or serialising blueprints.
///
/// None of these unwind: callers log them and fall back to a sentinel.
#[derive(Debug, thiserror::Error)]
pub enum BlueprintError {
    /// Failed to encode a record or a tree to MessagePack.
    #[error("failed to encode: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Failed to decode a record or a tree from MessagePack.
    #[error("failed to decode: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// A write was attempted after the blueprint switched to read mode.
    #[error("blueprint must be in write mode to write")]
    NotWritable,

    /// A read was attempted while the blueprint is still in write mode.
    #[error("blueprint must be in read mode to read")]
    NotReadable,

    /// The current record is not of the requested type.
    #[error("invalid type: requested {requested}, current record is {current}")]
    TypeMismatch {
        requested: &'static str,
        current: ComponentTypeId,
    },

    /// The cursor does not point at any data.
    #[error("no data to read from")]
    NoData,

    /// The current record only exists as a native object and has not been
    /// serialised yet. Call `Blueprint::materialize` first.
    #[error("record has not been materialized")]
    NotMaterialized,

    /// `finish_child` or `finish_children` was called with no open
    /// `start_children` frame.
    #[error("no children frame is open")]
    EmptyStack,

    /// `finish` was called while `start_children` frames are still open.
    #[error("{0} children frame(s) still open")]
    UnbalancedChildren(usize),

    /// No component handler is registered for a def type.
    #[error("no component handler registered for def type {0}")]
    UnregisteredType(ComponentTypeId),

    /// A buffer was too short to carry a file identifier.
    #[error("buffer of {0} bytes is too short for a file identifier")]
    MissingIdentifier(usize),

    /// A buffer carried a different file identifier than expected.
    #[error("expected file identifier {expected}, found {found}")]
    WrongIdentifier {
        expected: FileIdentifier,
        found: FileIdentifier,
    },
}

//! Factory error types.

use engine_blueprint::{BlueprintError, FileIdentifier};
use engine_component::{ComponentTypeId, Entity};

/// Errors raised while turning assets into entities.
///
/// The public `EntityFactory` API logs these and returns a sentinel (the
/// null entity or an empty buffer); the typed form exists for the internal
/// `try_*` paths and for tests.
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    /// No asset loader has been set.
    #[error("no asset loader set, cannot load {0}")]
    NoAssetLoader(String),

    /// The asset loader produced nothing for a filename.
    #[error("no such blueprint: {0}")]
    MissingAsset(String),

    /// The asset was loaded but is empty.
    #[error("blueprint asset is empty: {0}")]
    EmptyAsset(String),

    /// The buffer is too short to carry a file identifier.
    #[error("blueprint data for {0} has no file identifier")]
    MissingIdentifier(String),

    /// No converter is registered at all.
    #[error("no converters registered, cannot load {0}")]
    NoConverters(String),

    /// No registered converter matches the buffer's identifier.
    #[error("unknown file identifier {identifier} for entity {name}")]
    UnknownIdentifier {
        name: String,
        identifier: FileIdentifier,
    },

    /// The matching converter rejected the data.
    #[error("failed to convert blueprint {0}")]
    LoadFailed(String),

    /// An operation was asked to act on the null entity.
    #[error("cannot create the null entity")]
    NullEntity,

    /// No System owns a def type.
    #[error("no system registered for def type {def_type} on {entity}")]
    UnknownSystem {
        entity: Entity,
        def_type: ComponentTypeId,
    },

    /// No converter is registered under an identifier requested for saving.
    #[error("no converter registered for identifier {0}")]
    NoConverter(FileIdentifier),

    /// Serialising a tree failed.
    #[error(transparent)]
    Blueprint(#[from] BlueprintError),
}

//! JSON → blueprint compilation.
//!
//! The input describes one entity:
//!
//! ```json
//! {
//!   "components": [ { "def_type": "NameDef", "def": { "name": "root" } } ],
//!   "children": [ { "components": [] } ]
//! }
//! ```
//!
//! `def_type` is hashed into a def type, `def` is transcoded to a
//! MessagePack map, and the tree is fed to a [`BlueprintBuilder`] children
//! first.

use engine_blueprint::{BlueprintBuilder, BlueprintError, FileIdentifier};
use engine_component::ComponentTypeId;
use serde_json::Value;
use tracing::debug;

/// Errors produced while compiling a JSON entity description.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}: missing or invalid \"components\" array")]
    MissingComponents(String),

    #[error("{0}: \"children\" must be an array")]
    InvalidChildren(String),

    #[error("{0}: component has no \"def_type\" string")]
    MissingDefType(String),

    #[error("{0}: component has no \"def\"")]
    MissingDef(String),

    #[error("{path}: failed to encode component: {source}")]
    Encode {
        path: String,
        #[source]
        source: rmp_serde::encode::Error,
    },

    #[error("file identifier must be exactly 4 bytes, got {0:?}")]
    InvalidIdentifier(String),

    #[error(transparent)]
    Blueprint(#[from] BlueprintError),
}

/// Number of entities and components written by a compilation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileStats {
    pub entities: usize,
    pub components: usize,
}

/// Parse a 4-character file identifier such as `BLPT`.
///
/// # Errors
///
/// [`CompileError::InvalidIdentifier`] unless `text` is exactly 4 bytes.
pub fn parse_identifier(text: &str) -> Result<FileIdentifier, CompileError> {
    let bytes: [u8; 4] = text
        .as_bytes()
        .try_into()
        .map_err(|_| CompileError::InvalidIdentifier(text.to_string()))?;
    Ok(FileIdentifier(bytes))
}

/// Compile JSON text into a blueprint buffer tagged with `identifier`.
///
/// # Errors
///
/// Fails on malformed JSON or on an entity that does not match the expected
/// shape.
pub fn compile_json(
    text: &str,
    identifier: FileIdentifier,
) -> Result<(Vec<u8>, CompileStats), CompileError> {
    let root: Value = serde_json::from_str(text)?;
    compile_value(&root, identifier)
}

/// Compile an already-parsed JSON entity.
///
/// # Errors
///
/// See [`compile_json`].
pub fn compile_value(
    root: &Value,
    identifier: FileIdentifier,
) -> Result<(Vec<u8>, CompileStats), CompileError> {
    let mut builder = BlueprintBuilder::new();
    let mut stats = CompileStats::default();
    write_entity(&mut builder, root, "$", &mut stats)?;
    let buffer = builder.finish(identifier)?;
    Ok((buffer, stats))
}

fn write_entity(
    builder: &mut BlueprintBuilder,
    entity: &Value,
    path: &str,
    stats: &mut CompileStats,
) -> Result<(), CompileError> {
    let components = entity
        .get("components")
        .and_then(Value::as_array)
        .ok_or_else(|| CompileError::MissingComponents(path.to_string()))?;

    match entity.get("children") {
        None | Some(Value::Null) => {}
        Some(Value::Array(children)) if children.is_empty() => {}
        Some(Value::Array(children)) => {
            builder.start_children();
            for (index, child) in children.iter().enumerate() {
                write_entity(builder, child, &format!("{path}.children[{index}]"), stats)?;
                builder.finish_child()?;
            }
            builder.finish_children()?;
        }
        Some(_) => return Err(CompileError::InvalidChildren(path.to_string())),
    }

    for (index, component) in components.iter().enumerate() {
        let path = format!("{path}.components[{index}]");
        let def_type = component
            .get("def_type")
            .and_then(Value::as_str)
            .ok_or_else(|| CompileError::MissingDefType(path.clone()))?;
        let def = component
            .get("def")
            .ok_or_else(|| CompileError::MissingDef(path.clone()))?;
        let record = rmp_serde::to_vec_named(def)
            .map_err(|source| CompileError::Encode { path: path.clone(), source })?;
        debug!(%path, def_type, size = record.len(), "compiled component");
        builder.add_component(ComponentTypeId::from_name(def_type), &record);
        stats.components += 1;
    }
    stats.entities += 1;
    Ok(())
}

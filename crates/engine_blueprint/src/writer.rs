//! Serialises a [`BlueprintTree`] into the tree-structured wire format.

use tracing::error;

use crate::blueprint::Blueprint;
use crate::builder::BlueprintBuilder;
use crate::error::BlueprintError;
use crate::format::FileIdentifier;
use crate::handlers::ComponentHandlers;
use crate::tree::BlueprintTree;

/// Walks a [`BlueprintTree`] depth-first, children before parents, and feeds
/// every record through its registered handler into a [`BlueprintBuilder`].
///
/// Records are decoded and re-encoded on the way through, so the output is
/// canonical whatever backing each record came from.
#[derive(Debug)]
pub struct BlueprintWriter<'h> {
    handlers: &'h ComponentHandlers,
    builder: BlueprintBuilder,
    identifier: FileIdentifier,
}

impl<'h> BlueprintWriter<'h> {
    /// Create a writer producing [`FileIdentifier::BLUEPRINT`] buffers.
    #[must_use]
    pub fn new(handlers: &'h ComponentHandlers) -> Self {
        Self {
            handlers,
            builder: BlueprintBuilder::new(),
            identifier: FileIdentifier::BLUEPRINT,
        }
    }

    /// Tag produced buffers with a different identifier.
    #[must_use]
    pub fn with_identifier(mut self, identifier: FileIdentifier) -> Self {
        self.identifier = identifier;
        self
    }

    /// Serialise `tree`, returning an empty buffer on failure.
    ///
    /// Records without a registered handler are logged and left out.
    pub fn write_blueprint_tree(&mut self, tree: &mut BlueprintTree<'_>) -> Vec<u8> {
        match self.try_write_blueprint_tree(tree) {
            Ok(buffer) => buffer,
            Err(err) => {
                error!(%err, "failed to write blueprint tree");
                Vec::new()
            }
        }
    }

    /// Serialise `tree`.
    ///
    /// # Errors
    ///
    /// Fails if the builder protocol is violated or the tree cannot be
    /// encoded. The builder is reset either way.
    pub fn try_write_blueprint_tree(
        &mut self,
        tree: &mut BlueprintTree<'_>,
    ) -> Result<Vec<u8>, BlueprintError> {
        let result = self
            .write_node(tree)
            .and_then(|()| self.builder.finish(self.identifier));
        if result.is_err() {
            self.builder = BlueprintBuilder::new();
        }
        result
    }

    fn write_node(&mut self, tree: &mut BlueprintTree<'_>) -> Result<(), BlueprintError> {
        let (blueprint, children) = tree.parts_mut();
        if !children.is_empty() {
            self.builder.start_children();
            for child in children.iter_mut() {
                self.write_node(child)?;
                self.builder.finish_child()?;
            }
            self.builder.finish_children()?;
        }
        self.write_components(blueprint);
        Ok(())
    }

    fn write_components(&mut self, blueprint: &mut Blueprint<'_>) {
        let Self {
            handlers, builder, ..
        } = self;
        blueprint.for_each_component(|record| {
            let def_type = record.legacy_type();
            if !handlers.is_registered(def_type) {
                error!(%def_type, "no component handler registered, skipping record");
                return;
            }
            let canonical = match record.native_object() {
                Some(object) => handlers.write_to_buffer(def_type, object),
                None => record
                    .legacy_data()
                    .and_then(|data| handlers.canonicalize(def_type, data)),
            };
            match canonical {
                Ok(bytes) => builder.add_component(def_type, &bytes),
                Err(err) => error!(%def_type, %err, "failed to serialise record, skipping"),
            }
        });
    }
}

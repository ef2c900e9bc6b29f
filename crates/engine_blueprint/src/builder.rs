//! Low-level builder for the tree-structured wire format.
//!
//! [`BlueprintBuilder`] assembles an entity hierarchy depth-first, children
//! before parents. For an entity with children the calls go:
//!
//! ```text
//! start_children()
//!     ... each child, then finish_child() ...
//! finish_children()
//! add_component(..) for the entity itself
//! finish_child()        // or finish(identifier) for the root
//! ```
//!
//! Every call returns a [`Result`], so a misbalanced sequence is reported at
//! the offending call instead of surfacing as a corrupt buffer.

use engine_component::ComponentTypeId;
use tracing::error;

use crate::codec;
use crate::error::BlueprintError;
use crate::format::{FileIdentifier, OwnedBlueprintDef, OwnedComponentDef};

/// Stack-based serialiser for entity trees.
#[derive(Debug, Default)]
pub struct BlueprintBuilder {
    /// Sibling lists currently being assembled, innermost last.
    stack: Vec<Vec<OwnedBlueprintDef>>,
    /// Components of the entity about to be finished.
    components: Vec<OwnedComponentDef>,
    /// Children of the entity about to be finished.
    children: Vec<OwnedBlueprintDef>,
}

impl BlueprintBuilder {
    /// Creates a builder positioned at the root entity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a serialised component to the entity currently being built.
    pub fn add_component(&mut self, def_type: ComponentTypeId, def: &[u8]) {
        self.components.push(OwnedComponentDef {
            def_type: def_type.0,
            def: def.to_vec(),
        });
    }

    /// Opens a list of children for the entity about to be built.
    pub fn start_children(&mut self) {
        self.stack.push(Vec::new());
    }

    /// Finishes the current entity and appends it to the innermost open
    /// children list.
    ///
    /// # Errors
    ///
    /// Returns [`BlueprintError::EmptyStack`] if no children list is open.
    /// The builder state is left untouched in that case.
    pub fn finish_child(&mut self) -> Result<(), BlueprintError> {
        if self.stack.is_empty() {
            error!("finish_child called without start_children");
            return Err(BlueprintError::EmptyStack);
        }
        let entity = self.take_entity();
        if let Some(siblings) = self.stack.last_mut() {
            siblings.push(entity);
        }
        Ok(())
    }

    /// Closes the innermost children list; it becomes the children of the
    /// next entity to be finished.
    ///
    /// # Errors
    ///
    /// Returns [`BlueprintError::EmptyStack`] if no children list is open.
    pub fn finish_children(&mut self) -> Result<(), BlueprintError> {
        let Some(children) = self.stack.pop() else {
            error!("finish_children called without start_children");
            return Err(BlueprintError::EmptyStack);
        };
        self.children = children;
        Ok(())
    }

    /// Finishes the root entity and serialises the whole tree behind
    /// `identifier`. The builder is reset on success.
    ///
    /// # Errors
    ///
    /// Returns [`BlueprintError::UnbalancedChildren`] if children lists are
    /// still open, or [`BlueprintError::Encode`] if serialisation fails.
    pub fn finish(&mut self, identifier: FileIdentifier) -> Result<Vec<u8>, BlueprintError> {
        if !self.stack.is_empty() {
            error!(
                open = self.stack.len(),
                "finish called with unbalanced start_children/finish_children"
            );
            return Err(BlueprintError::UnbalancedChildren(self.stack.len()));
        }
        let root = self.take_entity();
        codec::encode_tagged(identifier, &root)
    }

    /// Number of children lists currently open.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn take_entity(&mut self) -> OwnedBlueprintDef {
        OwnedBlueprintDef {
            components: std::mem::take(&mut self.components),
            children: std::mem::take(&mut self.children),
        }
    }
}

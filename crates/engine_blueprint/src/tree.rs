//! In-memory entity hierarchies.

use std::ops::{Deref, DerefMut};

use crate::blueprint::Blueprint;

/// A [`Blueprint`] plus an ordered list of child trees.
///
/// Derefs to its own blueprint, so components are written with
/// `tree.write(&value)`. Child order is construction order.
#[derive(Debug, Default)]
pub struct BlueprintTree<'a> {
    blueprint: Blueprint<'a>,
    children: Vec<BlueprintTree<'a>>,
}

impl<'a> BlueprintTree<'a> {
    /// Creates an empty tree node in write mode.
    #[must_use]
    pub fn new() -> Self {
        Self::from_blueprint(Blueprint::new())
    }

    /// Creates a childless node around an existing blueprint.
    #[must_use]
    pub fn from_blueprint(blueprint: Blueprint<'a>) -> Self {
        Self {
            blueprint,
            children: Vec::new(),
        }
    }

    /// Appends an empty child and returns it.
    pub fn new_child(&mut self) -> &mut BlueprintTree<'a> {
        self.children.push(BlueprintTree::new());
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Appends an already-built child.
    pub fn push_child(&mut self, child: BlueprintTree<'a>) {
        self.children.push(child);
    }

    /// The ordered children of this node.
    #[must_use]
    pub fn children(&self) -> &[BlueprintTree<'a>] {
        &self.children
    }

    /// Mutable access to the ordered children of this node.
    pub fn children_mut(&mut self) -> &mut Vec<BlueprintTree<'a>> {
        &mut self.children
    }

    /// Splits the node into its own blueprint and its children.
    pub fn parts_mut(&mut self) -> (&mut Blueprint<'a>, &mut Vec<BlueprintTree<'a>>) {
        (&mut self.blueprint, &mut self.children)
    }
}

impl<'a> Deref for BlueprintTree<'a> {
    type Target = Blueprint<'a>;

    fn deref(&self) -> &Self::Target {
        &self.blueprint
    }
}

impl DerefMut for BlueprintTree<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.blueprint
    }
}

//! Pluggable wire formats.
//!
//! A [`BlueprintConverter`] turns the bytes of one wire format into a
//! [`BlueprintTree`] and back. Each format is tagged with a
//! [`FileIdentifier`] so several can be registered side by side and the
//! right one picked from the first four bytes of an asset.

use engine_component::ComponentTypeId;
use tracing::error;

use crate::blueprint::Blueprint;
use crate::codec;
use crate::format::{BlueprintDef, FileIdentifier};
use crate::handlers::ComponentHandlers;
use crate::tree::BlueprintTree;
use crate::writer::BlueprintWriter;

/// Converts between one wire format and [`BlueprintTree`]s.
pub trait BlueprintConverter: Send + Sync {
    /// The tag at the start of every buffer in this format.
    fn identifier(&self) -> FileIdentifier;

    /// Parse `data` into a tree whose records borrow from `data`. Returns
    /// `None` (after logging) if `data` is not a valid buffer.
    fn load<'a>(&self, data: &'a [u8]) -> Option<BlueprintTree<'a>>;

    /// Serialise `tree` into this format. Returns an empty buffer on failure.
    fn finalize(&self, handlers: &ComponentHandlers, tree: &mut BlueprintTree<'_>) -> Vec<u8>;

    /// Def types this format knows by name, if it keeps such a list.
    fn def_types(&self) -> &[ComponentTypeId] {
        &[]
    }
}

/// The tree-structured blueprint format ([`FileIdentifier::BLUEPRINT`]).
#[derive(Debug, Clone)]
pub struct TreeConverter {
    identifier: FileIdentifier,
}

impl TreeConverter {
    /// A converter for buffers tagged [`FileIdentifier::BLUEPRINT`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            identifier: FileIdentifier::BLUEPRINT,
        }
    }

    /// Use a different tag for the same tree layout.
    #[must_use]
    pub fn with_identifier(identifier: FileIdentifier) -> Self {
        Self { identifier }
    }
}

impl Default for TreeConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl BlueprintConverter for TreeConverter {
    fn identifier(&self) -> FileIdentifier {
        self.identifier
    }

    fn load<'a>(&self, data: &'a [u8]) -> Option<BlueprintTree<'a>> {
        match codec::decode_tagged::<BlueprintDef<'a>>(self.identifier, data) {
            Ok(root) => Some(tree_from_def(root)),
            Err(err) => {
                error!(identifier = %self.identifier, %err, "failed to load blueprint");
                None
            }
        }
    }

    fn finalize(&self, handlers: &ComponentHandlers, tree: &mut BlueprintTree<'_>) -> Vec<u8> {
        BlueprintWriter::new(handlers)
            .with_identifier(self.identifier)
            .write_blueprint_tree(tree)
    }
}

/// Build a tree whose blueprints read their records straight out of the
/// decoded wire structure.
fn tree_from_def(def: BlueprintDef<'_>) -> BlueprintTree<'_> {
    let BlueprintDef {
        components,
        children,
    } = def;
    let count = components.len();
    let blueprint = Blueprint::from_accessor(
        move |index| {
            components
                .get(index)
                .map(|component| (ComponentTypeId(component.def_type), component.def))
        },
        count,
    );
    let mut tree = BlueprintTree::from_blueprint(blueprint);
    for child in children {
        tree.push_child(tree_from_def(child));
    }
    tree
}

#[cfg(test)]
mod tests {
    use engine_component::Component;
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct NameDef {
        name: String,
    }

    impl Component for NameDef {
        fn type_name() -> &'static str {
            "NameDef"
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct ValueDef {
        value: i32,
    }

    impl Component for ValueDef {
        fn type_name() -> &'static str {
            "ValueDef"
        }
    }

    fn handlers() -> ComponentHandlers {
        let mut handlers = ComponentHandlers::new();
        handlers.register::<NameDef>();
        handlers.register::<ValueDef>();
        handlers
    }

    fn name(s: &str) -> NameDef {
        NameDef {
            name: s.to_string(),
        }
    }

    /// (def type, record bytes) of every component of a node, in order.
    fn records(tree: &mut BlueprintTree<'_>) -> Vec<(ComponentTypeId, Vec<u8>)> {
        let mut out = Vec::new();
        tree.for_each_component(|record| {
            out.push((record.legacy_type(), record.legacy_data().unwrap().to_vec()));
        });
        out
    }

    #[test]
    fn test_load_restores_order_types_and_payloads() {
        let converter = TreeConverter::new();
        let handlers = handlers();

        let mut original = BlueprintTree::new();
        original.write(&name("root")).unwrap();
        original.write(&ValueDef { value: 5 }).unwrap();
        original.new_child().write(&name("child")).unwrap();
        let expected_root = records(&mut original);
        let expected_child = records(&mut original.children_mut()[0]);

        let buffer = converter.finalize(&handlers, &mut original);
        let mut loaded = converter.load(&buffer).unwrap();
        assert_eq!(records(&mut loaded), expected_root);
        assert_eq!(loaded.children().len(), 1);
        assert_eq!(records(&mut loaded.children_mut()[0]), expected_child);

        let mut values = Vec::new();
        loaded.for_each_component(|record| {
            if record.is::<ValueDef>() {
                values.push(record.read::<ValueDef>().unwrap().value);
            }
        });
        assert_eq!(values, [5]);
    }

    #[test]
    fn test_write_read_write_is_idempotent() {
        let converter = TreeConverter::new();
        let handlers = handlers();

        let mut original = BlueprintTree::new();
        original.write(&name("a")).unwrap();
        let child = original.new_child();
        child.write(&ValueDef { value: 1 }).unwrap();
        child.new_child().write(&name("c")).unwrap();

        let first = converter.finalize(&handlers, &mut original);
        let mut loaded = converter.load(&first).unwrap();
        let second = converter.finalize(&handlers, &mut loaded);
        assert_eq!(first, second);
    }

    #[test]
    fn test_load_rejects_other_identifier() {
        let converter = TreeConverter::new();
        let mut tree = BlueprintTree::new();
        let buffer = TreeConverter::with_identifier(FileIdentifier(*b"XXXX"))
            .finalize(&handlers(), &mut tree);
        assert!(converter.load(&buffer).is_none());
        assert!(converter.load(b"BLPT\xc1").is_none());
    }
}

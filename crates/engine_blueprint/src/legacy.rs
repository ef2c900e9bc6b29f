//! The legacy entity format ([`FileIdentifier::LEGACY`]).
//!
//! Legacy buffers were produced by a schema compiler that stored a
//! component's type as a union index instead of a def-type hash. The index
//! is 1-based into the list of component type names the converter was built
//! with; `0` means "none". Otherwise the layout mirrors the tree format:
//!
//! ```text
//! EntityDef          = [ components: [LegacyComponentDef], children: [EntityDef] ]
//! LegacyComponentDef = [ def_type: u16 (union index), def: bin ]
//! ```

use engine_component::ComponentTypeId;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::blueprint::{Blueprint, TypedRecord};
use crate::codec;
use crate::converter::BlueprintConverter;
use crate::error::BlueprintError;
use crate::format::{FileIdentifier, serialize_raw};
use crate::handlers::ComponentHandlers;
use crate::tree::BlueprintTree;

/// One component of a legacy entity, borrowed from the wire buffer.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LegacyComponentDef<'a> {
    /// 1-based union index of the component type; `0` is "none".
    pub def_type: u16,
    /// The serialised record.
    pub def: &'a [u8],
}

/// One legacy entity node, borrowed from the wire buffer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntityDef<'a> {
    #[serde(borrow)]
    pub components: Vec<LegacyComponentDef<'a>>,
    #[serde(borrow)]
    pub children: Vec<EntityDef<'a>>,
}

/// Writer-side legacy component entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnedLegacyComponentDef {
    pub def_type: u16,
    #[serde(serialize_with = "serialize_raw")]
    pub def: Vec<u8>,
}

/// Writer-side legacy entity node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OwnedEntityDef {
    pub components: Vec<OwnedLegacyComponentDef>,
    pub children: Vec<OwnedEntityDef>,
}

/// Converter for the legacy union-indexed format.
#[derive(Debug, Clone)]
pub struct LegacyConverter {
    identifier: FileIdentifier,
    def_types: Vec<ComponentTypeId>,
}

impl LegacyConverter {
    /// Build a converter from the ordered component type names of the
    /// legacy schema's union (without the leading "NONE").
    #[must_use]
    pub fn new(type_names: &[&str]) -> Self {
        Self {
            identifier: FileIdentifier::LEGACY,
            def_types: type_names
                .iter()
                .map(|name| ComponentTypeId::from_name(name))
                .collect(),
        }
    }

    /// Def type stored under a union index.
    #[must_use]
    pub fn lookup(&self, index: u16) -> Option<ComponentTypeId> {
        let slot = usize::from(index).checked_sub(1)?;
        self.def_types.get(slot).copied()
    }

    /// Union index of a def type, or `0` if the schema does not know it.
    #[must_use]
    pub fn reverse_lookup(&self, def_type: ComponentTypeId) -> u16 {
        self.def_types
            .iter()
            .position(|&known| known == def_type)
            .and_then(|slot| u16::try_from(slot + 1).ok())
            .unwrap_or(0)
    }

    fn tree_from_def<'a>(&self, def: EntityDef<'a>) -> BlueprintTree<'a> {
        let records: Vec<TypedRecord<'a>> = def
            .components
            .iter()
            .filter_map(|component| match self.lookup(component.def_type) {
                Some(def_type) => Some((def_type, component.def)),
                None => {
                    error!(index = component.def_type, "unknown legacy component type, skipping");
                    None
                }
            })
            .collect();
        let count = records.len();
        let blueprint = Blueprint::from_accessor(move |index| records.get(index).copied(), count);
        let mut tree = BlueprintTree::from_blueprint(blueprint);
        for child in def.children {
            tree.push_child(self.tree_from_def(child));
        }
        tree
    }

    fn entity_from_tree(&self, tree: &mut BlueprintTree<'_>) -> OwnedEntityDef {
        let mut entity = OwnedEntityDef::default();
        let (blueprint, children) = tree.parts_mut();
        blueprint.for_each_component_mut(|record| {
            let def_type = record.legacy_type();
            let index = self.reverse_lookup(def_type);
            if index == 0 {
                warn!(%def_type, "def type not in legacy schema, skipping record");
                return;
            }
            match record.materialize() {
                Ok(def) => entity.components.push(OwnedLegacyComponentDef {
                    def_type: index,
                    def: def.to_vec(),
                }),
                Err(err) => error!(%def_type, %err, "failed to serialise record, skipping"),
            }
        });
        entity.children = children
            .iter_mut()
            .map(|child| self.entity_from_tree(child))
            .collect();
        entity
    }

    fn try_finalize(&self, tree: &mut BlueprintTree<'_>) -> Result<Vec<u8>, BlueprintError> {
        let entity = self.entity_from_tree(tree);
        codec::encode_tagged(self.identifier, &entity)
    }
}

impl BlueprintConverter for LegacyConverter {
    fn identifier(&self) -> FileIdentifier {
        self.identifier
    }

    fn load<'a>(&self, data: &'a [u8]) -> Option<BlueprintTree<'a>> {
        match codec::decode_tagged::<EntityDef<'a>>(self.identifier, data) {
            Ok(root) => Some(self.tree_from_def(root)),
            Err(err) => {
                error!(identifier = %self.identifier, %err, "failed to load legacy entity");
                None
            }
        }
    }

    fn finalize(&self, _handlers: &ComponentHandlers, tree: &mut BlueprintTree<'_>) -> Vec<u8> {
        self.try_finalize(tree).unwrap_or_else(|err| {
            error!(%err, "failed to finalize legacy entity");
            Vec::new()
        })
    }

    fn def_types(&self) -> &[ComponentTypeId] {
        &self.def_types
    }
}

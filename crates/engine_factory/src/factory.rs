//! The entity factory.
//!
//! [`EntityFactory`] allocates entity ids and turns blueprint assets into
//! entities by routing every component record to the [`System`] that owns
//! its def type. Assets are identified by a 4-byte [`FileIdentifier`] and
//! parsed by whichever registered [`BlueprintConverter`] claims it, so the
//! tree format and the legacy format can be loaded side by side.
//!
//! ## Construction order
//!
//! For each node of a [`BlueprintTree`]:
//!
//! 1. `create_component` on the owning System for every record of the node.
//! 2. Every child is fully constructed through the create-child hook.
//! 3. `post_create_component` for every record of the node.
//!
//! A parent's post-create step can therefore find its children.
//!
//! ## Threading
//!
//! Construction and destruction run on the thread that owns the Systems.
//! Entity-id allocation and the pending-destroy queue share one mutex, and
//! [`DestructionQueue`] handles can queue entities from any thread.

use std::any::TypeId;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use engine_blueprint::{
    Blueprint, BlueprintConverter, BlueprintTree, BlueprintWriter, ComponentHandlers,
    FileIdentifier,
};
use engine_component::{Component, ComponentTypeId, Entity, EntityAllocator};
use tracing::{debug, error, warn};

use crate::asset::{AssetLoader, BlueprintCache};
use crate::config::FactoryConfig;
use crate::error::FactoryError;
use crate::system::System;

/// Builds one child of a tree node. Receives the factory, the parent entity
/// and the child's subtree, and returns the child entity.
pub type CreateChildFn =
    Arc<dyn Fn(&mut EntityFactory, Entity, &mut BlueprintTree<'_>) -> Entity + Send + Sync>;

/// State shared between the factory and its [`DestructionQueue`] handles.
#[derive(Debug, Default)]
struct Shared {
    allocator: EntityAllocator,
    pending_destroy: VecDeque<Entity>,
}

/// Default create-child hook: the child becomes a standalone entity and the
/// parent link is left to whoever needs it.
fn create_standalone_child(
    factory: &mut EntityFactory,
    _parent: Entity,
    child: &mut BlueprintTree<'_>,
) -> Entity {
    factory.create_from_tree(child)
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A cloneable handle for queueing entities for destruction from any thread.
///
/// Queued entities are destroyed by the next
/// [`EntityFactory::destroy_queued_entities`].
#[derive(Debug, Clone)]
pub struct DestructionQueue {
    shared: Arc<Mutex<Shared>>,
}

impl DestructionQueue {
    /// Queue `entity` for destruction. The null entity is ignored.
    pub fn queue_for_destruction(&self, entity: Entity) {
        if !entity.is_valid() {
            return;
        }
        lock(&self.shared).pending_destroy.push_back(entity);
    }

    /// Number of entities waiting to be destroyed.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.shared).pending_destroy.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Creates and destroys entities from blueprints.
pub struct EntityFactory {
    config: FactoryConfig,
    shared: Arc<Mutex<Shared>>,
    /// Systems in the order they were added.
    systems: Vec<Arc<dyn System>>,
    system_index: HashMap<TypeId, usize>,
    def_type_to_system_type: HashMap<ComponentTypeId, TypeId>,
    converters: Vec<Box<dyn BlueprintConverter>>,
    handlers: ComponentHandlers,
    loader: Option<Box<dyn AssetLoader>>,
    blueprints: BlueprintCache,
    entity_to_blueprint_map: HashMap<Entity, String>,
    create_child_fn: CreateChildFn,
}

impl EntityFactory {
    /// Create a factory with no Systems, converters or asset loader.
    #[must_use]
    pub fn new(config: FactoryConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Mutex::new(Shared::default())),
            systems: Vec::new(),
            system_index: HashMap::new(),
            def_type_to_system_type: HashMap::new(),
            converters: Vec::new(),
            handlers: ComponentHandlers::new(),
            loader: None,
            blueprints: BlueprintCache::new(),
            entity_to_blueprint_map: HashMap::new(),
            create_child_fn: Arc::new(create_standalone_child),
        }
    }

    #[must_use]
    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    /// Use `loader` to fetch blueprint assets by filename.
    #[must_use]
    pub fn with_asset_loader(mut self, loader: impl AssetLoader + 'static) -> Self {
        self.set_asset_loader(loader);
        self
    }

    pub fn set_asset_loader(&mut self, loader: impl AssetLoader + 'static) {
        self.loader = Some(Box::new(loader));
    }

    // -- registration -------------------------------------------------------

    /// Add a System and register the def types it reports through
    /// [`System::def_types`]. Adding a System type twice keeps the first.
    pub fn add_system<S: System>(&mut self, system: Arc<S>) {
        let system_type = TypeId::of::<S>();
        if self.system_index.contains_key(&system_type) {
            warn!(system = std::any::type_name::<S>(), "system already added, ignoring");
            return;
        }
        let def_types = system.def_types();
        self.system_index.insert(system_type, self.systems.len());
        self.systems.push(system);
        for def_type in def_types {
            self.register_def_for(system_type, std::any::type_name::<S>(), def_type);
        }
    }

    /// Route records of `def_type` to the System type `S`.
    pub fn register_def<S: System>(&mut self, def_type: ComponentTypeId) {
        self.register_def_for(TypeId::of::<S>(), std::any::type_name::<S>(), def_type);
    }

    fn register_def_for(
        &mut self,
        system_type: TypeId,
        system_name: &'static str,
        def_type: ComponentTypeId,
    ) {
        if let Some(previous) = self.def_type_to_system_type.insert(def_type, system_type)
            && previous != system_type
        {
            warn!(%def_type, system = system_name, "def type re-registered to another system");
        }
    }

    /// Register the native type of a component so trees holding it can be
    /// finalized.
    pub fn register_component<T: Component>(&mut self) {
        self.handlers.register::<T>();
    }

    #[must_use]
    pub fn handlers(&self) -> &ComponentHandlers {
        &self.handlers
    }

    /// Register a wire format. A converter with the same identifier as an
    /// existing one replaces it.
    pub fn register_converter(&mut self, converter: impl BlueprintConverter + 'static) {
        let identifier = converter.identifier();
        let converter: Box<dyn BlueprintConverter> = Box::new(converter);
        match self
            .converters
            .iter()
            .position(|existing| existing.identifier() == identifier)
        {
            Some(index) => {
                warn!(%identifier, "replacing converter");
                self.converters[index] = converter;
            }
            None => self.converters.push(converter),
        }
    }

    /// Replace the hook used to build the children of a tree node.
    pub fn set_create_child_fn<F>(&mut self, create_child: F)
    where
        F: Fn(&mut EntityFactory, Entity, &mut BlueprintTree<'_>) -> Entity + Send + Sync + 'static,
    {
        self.create_child_fn = Arc::new(create_child);
    }

    /// Call [`System::initialize`] on every System, in the order they were
    /// added.
    pub fn initialize(&self) {
        if self.systems.is_empty() {
            error!("no systems added to the entity factory before initialize");
        }
        for system in &self.systems {
            system.initialize();
        }
    }

    // -- creation -----------------------------------------------------------

    /// An empty blueprint sized by [`FactoryConfig::record_buffer_capacity`].
    #[must_use]
    pub fn new_blueprint(&self) -> Blueprint<'static> {
        Blueprint::with_capacity(self.config.record_buffer_capacity)
    }

    /// An empty tree whose root is sized like [`EntityFactory::new_blueprint`].
    #[must_use]
    pub fn new_tree(&self) -> BlueprintTree<'static> {
        BlueprintTree::from_blueprint(self.new_blueprint())
    }

    /// Allocate a new entity without any components.
    ///
    /// # Panics
    ///
    /// Panics if the entity counter would wrap back to the null entity.
    pub fn create(&mut self) -> Entity {
        let entity = lock(&self.shared).allocator.allocate();
        self.entity_to_blueprint_map.insert(entity, String::new());
        entity
    }

    /// Create an entity from the blueprint asset `name`. Returns the null
    /// entity if the asset cannot be loaded or converted.
    pub fn create_from_name(&mut self, name: &str) -> Entity {
        self.try_create_from_name(name).unwrap_or_else(|err| {
            error!(name, %err, "failed to create entity");
            Entity::INVALID
        })
    }

    fn try_create_from_name(&mut self, name: &str) -> Result<Entity, FactoryError> {
        let asset = self.blueprint_asset(name)?;
        self.try_create_from_data(&asset, name)
    }

    /// Create an entity from serialised blueprint `data`, using `name` only
    /// for diagnostics. Returns the null entity on failure.
    pub fn create_from_data(&mut self, data: &[u8], name: &str) -> Entity {
        self.try_create_from_data(data, name).unwrap_or_else(|err| {
            error!(name, %err, "failed to create entity");
            Entity::INVALID
        })
    }

    fn try_create_from_data(&mut self, data: &[u8], name: &str) -> Result<Entity, FactoryError> {
        let mut tree = self.load_tree(data, name)?;
        let entity = self.create();
        self.entity_to_blueprint_map.insert(entity, name.to_string());
        self.build(entity, &mut tree);
        Ok(entity)
    }

    /// Add the components of the blueprint asset `name` to an existing
    /// entity. Returns `entity`, or the null entity on failure.
    pub fn populate_from_name(&mut self, entity: Entity, name: &str) -> Entity {
        self.try_populate_from_name(entity, name)
            .unwrap_or_else(|err| {
                error!(%entity, name, %err, "failed to populate entity");
                Entity::INVALID
            })
    }

    fn try_populate_from_name(&mut self, entity: Entity, name: &str) -> Result<Entity, FactoryError> {
        if !entity.is_valid() {
            return Err(FactoryError::NullEntity);
        }
        let asset = self.blueprint_asset(name)?;
        let mut tree = self.load_tree(&asset, name)?;
        self.entity_to_blueprint_map.insert(entity, name.to_string());
        self.build(entity, &mut tree);
        Ok(entity)
    }

    /// Create an entity from a single blueprint with no children.
    pub fn create_from_blueprint(&mut self, blueprint: &mut Blueprint<'_>) -> Entity {
        let entity = self.create();
        self.build_node(entity, blueprint, &mut []);
        entity
    }

    /// Create an entity, and its children, from an in-memory tree.
    pub fn create_from_tree(&mut self, tree: &mut BlueprintTree<'_>) -> Entity {
        let entity = self.create();
        self.populate_from_tree(entity, tree)
    }

    /// Add the components, and children, of `tree` to an existing entity.
    /// Returns `entity`, or the null entity if `entity` is null.
    pub fn populate_from_tree(&mut self, entity: Entity, tree: &mut BlueprintTree<'_>) -> Entity {
        if !entity.is_valid() {
            error!(err = %FactoryError::NullEntity, "failed to populate entity");
            return Entity::INVALID;
        }
        self.entity_to_blueprint_map.entry(entity).or_default();
        self.build(entity, tree);
        entity
    }

    fn build(&mut self, entity: Entity, tree: &mut BlueprintTree<'_>) {
        let (blueprint, children) = tree.parts_mut();
        self.build_node(entity, blueprint, children);
    }

    fn build_node(
        &mut self,
        entity: Entity,
        blueprint: &mut Blueprint<'_>,
        children: &mut [BlueprintTree<'_>],
    ) {
        blueprint.for_each_component(|record| match self.system_for(entity, record.legacy_type()) {
            Ok(system) => system.create_component(entity, record),
            Err(err) => error!(
                source = self.source_name(entity),
                %err,
                "skipping component"
            ),
        });

        if !children.is_empty() {
            let create_child = Arc::clone(&self.create_child_fn);
            for child in children.iter_mut() {
                create_child(self, entity, child);
            }
        }

        blueprint.for_each_component(|record| {
            if let Ok(system) = self.system_for(entity, record.legacy_type()) {
                system.post_create_component(entity, record);
            }
        });
    }

    fn system_for(
        &self,
        entity: Entity,
        def_type: ComponentTypeId,
    ) -> Result<&Arc<dyn System>, FactoryError> {
        self.def_type_to_system_type
            .get(&def_type)
            .and_then(|system_type| self.system_index.get(system_type))
            .and_then(|&index| self.systems.get(index))
            .ok_or(FactoryError::UnknownSystem { entity, def_type })
    }

    fn source_name(&self, entity: Entity) -> &str {
        self.entity_to_blueprint_map
            .get(&entity)
            .map_or("", String::as_str)
    }

    // -- assets and converters ---------------------------------------------

    fn blueprint_asset(&mut self, name: &str) -> Result<Arc<[u8]>, FactoryError> {
        let filename = self.config.resolve_filename(name);
        let Some(loader) = self.loader.as_deref() else {
            return Err(FactoryError::NoAssetLoader(filename));
        };
        self.blueprints.get_or_load(&filename, loader)
    }

    /// Evict the cached asset of `name`. Returns `true` if it was cached.
    pub fn release_blueprint(&mut self, name: &str) -> bool {
        let filename = self.config.resolve_filename(name);
        self.blueprints.release(&filename)
    }

    fn load_tree<'a>(&self, data: &'a [u8], name: &str) -> Result<BlueprintTree<'a>, FactoryError> {
        let converter = self.converter_for_data(data, name)?;
        debug!(name, identifier = %converter.identifier(), "loading blueprint");
        converter
            .load(data)
            .ok_or_else(|| FactoryError::LoadFailed(name.to_string()))
    }

    fn converter_for_data(
        &self,
        data: &[u8],
        name: &str,
    ) -> Result<&dyn BlueprintConverter, FactoryError> {
        if self.converters.is_empty() {
            return Err(FactoryError::NoConverters(name.to_string()));
        }
        if let Some(converter) = self.single_converter() {
            return Ok(converter);
        }
        let identifier = FileIdentifier::from_prefix(data)
            .ok_or_else(|| FactoryError::MissingIdentifier(name.to_string()))?;
        self.converter(identifier)
            .ok_or_else(|| FactoryError::UnknownIdentifier {
                name: name.to_string(),
                identifier,
            })
    }

    /// The only registered converter, when the fallback is enabled.
    fn single_converter(&self) -> Option<&dyn BlueprintConverter> {
        match self.converters.as_slice() {
            [only] if self.config.single_converter_fallback => Some(&**only),
            _ => None,
        }
    }

    fn converter(&self, identifier: FileIdentifier) -> Option<&dyn BlueprintConverter> {
        self.converters
            .iter()
            .find(|converter| converter.identifier() == identifier)
            .map(|converter| &**converter)
    }

    /// Def types known by name to the converter registered for
    /// `identifier`.
    #[must_use]
    pub fn converter_def_types(&self, identifier: FileIdentifier) -> &[ComponentTypeId] {
        self.converter(identifier)
            .map(|converter| converter.def_types())
            .unwrap_or_default()
    }

    // -- saving -------------------------------------------------------------

    /// Serialise `tree` in the tree format. Returns an empty buffer on
    /// failure.
    ///
    /// With [`FactoryConfig::single_converter_fallback`] set and exactly one
    /// converter registered, that converter's format is used instead.
    pub fn finalize(&self, tree: &mut BlueprintTree<'_>) -> Vec<u8> {
        if let Some(converter) = self.single_converter() {
            return converter.finalize(&self.handlers, tree);
        }
        self.try_finalize(tree).unwrap_or_else(|err| {
            error!(%err, "failed to finalize blueprint tree");
            Vec::new()
        })
    }

    fn try_finalize(&self, tree: &mut BlueprintTree<'_>) -> Result<Vec<u8>, FactoryError> {
        Ok(BlueprintWriter::new(&self.handlers).try_write_blueprint_tree(tree)?)
    }

    /// Serialise `tree` with the converter registered for `identifier`.
    /// Returns an empty buffer on failure.
    pub fn finalize_as(&self, identifier: FileIdentifier, tree: &mut BlueprintTree<'_>) -> Vec<u8> {
        match self.converter(identifier) {
            Some(converter) => converter.finalize(&self.handlers, tree),
            None => {
                error!(err = %FactoryError::NoConverter(identifier), "failed to finalize blueprint tree");
                Vec::new()
            }
        }
    }

    // -- destruction --------------------------------------------------------

    /// Destroy `entity` immediately on every System.
    pub fn destroy(&mut self, entity: Entity) {
        if !entity.is_valid() {
            return;
        }
        self.entity_to_blueprint_map.remove(&entity);
        for system in &self.systems {
            system.destroy(entity);
        }
    }

    /// Queue `entity` for the next [`EntityFactory::destroy_queued_entities`].
    pub fn queue_for_destruction(&self, entity: Entity) {
        self.destruction_queue().queue_for_destruction(entity);
    }

    /// A handle other threads can use to queue entities for destruction.
    #[must_use]
    pub fn destruction_queue(&self) -> DestructionQueue {
        DestructionQueue {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Destroy every queued entity in FIFO order.
    ///
    /// The queue is swapped out under the lock first, so entities queued
    /// while draining wait for the next call.
    pub fn destroy_queued_entities(&mut self) {
        let pending = std::mem::take(&mut lock(&self.shared).pending_destroy);
        for entity in pending {
            self.destroy(entity);
        }
    }

    /// Source blueprint name of every live entity; empty for entities not
    /// created from a named asset.
    #[must_use]
    pub fn entity_to_blueprint_map(&self) -> &HashMap<Entity, String> {
        &self.entity_to_blueprint_map
    }
}

impl Default for EntityFactory {
    fn default() -> Self {
        Self::new(FactoryConfig::default())
    }
}

impl std::fmt::Debug for EntityFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let identifiers: Vec<FileIdentifier> = self
            .converters
            .iter()
            .map(|converter| converter.identifier())
            .collect();
        f.debug_struct("EntityFactory")
            .field("config", &self.config)
            .field("systems", &self.systems.len())
            .field("def_types", &self.def_type_to_system_type.len())
            .field("converters", &identifiers)
            .field("handlers", &self.handlers)
            .field("blueprints", &self.blueprints)
            .field("entities", &self.entity_to_blueprint_map.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use engine_blueprint::{LegacyConverter, TreeConverter};
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

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct UnknownDef {
        flag: bool,
    }

    impl Component for UnknownDef {
        fn type_name() -> &'static str {
            "UnknownDef"
        }
    }

    type Log = Arc<Mutex<Vec<String>>>;

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    /// Owns `NameDef`; records every call it receives.
    struct NameSystem {
        log: Log,
        initialized: Mutex<usize>,
        on_destroy: Mutex<Option<(Entity, Entity, DestructionQueue)>>,
    }

    impl NameSystem {
        fn new(log: &Log) -> Arc<Self> {
            Arc::new(Self {
                log: Arc::clone(log),
                initialized: Mutex::new(0),
                on_destroy: Mutex::new(None),
            })
        }

        /// When `trigger` is destroyed, queue `target` through `queue`.
        fn requeue_on_destroy(&self, trigger: Entity, target: Entity, queue: DestructionQueue) {
            *self.on_destroy.lock().unwrap() = Some((trigger, target, queue));
        }
    }

    impl System for NameSystem {
        fn initialize(&self) {
            *self.initialized.lock().unwrap() += 1;
        }

        fn create_component(&self, entity: Entity, blueprint: &Blueprint<'_>) {
            let name = blueprint.read::<NameDef>().unwrap().name;
            self.log.lock().unwrap().push(format!("create {} {name}", entity.id()));
        }

        fn post_create_component(&self, entity: Entity, blueprint: &Blueprint<'_>) {
            let name = blueprint.read::<NameDef>().unwrap().name;
            self.log.lock().unwrap().push(format!("post {} {name}", entity.id()));
        }

        fn destroy(&self, entity: Entity) {
            self.log.lock().unwrap().push(format!("destroy {}", entity.id()));
            if let Some((trigger, target, queue)) = &*self.on_destroy.lock().unwrap()
                && *trigger == entity
            {
                queue.queue_for_destruction(*target);
            }
        }

        fn def_types(&self) -> Vec<ComponentTypeId> {
            vec![NameDef::component_type_id()]
        }
    }

    /// Owns `ValueDef`; registered through `register_def`.
    struct ValueSystem {
        log: Log,
    }

    impl System for ValueSystem {
        fn create_component(&self, entity: Entity, blueprint: &Blueprint<'_>) {
            let value = blueprint.read::<ValueDef>().unwrap().value;
            self.log.lock().unwrap().push(format!("value {} {value}", entity.id()));
        }

        fn destroy(&self, _entity: Entity) {}
    }

    fn name(s: &str) -> NameDef {
        NameDef {
            name: s.to_string(),
        }
    }

    fn factory_with_systems(config: FactoryConfig) -> (EntityFactory, Arc<NameSystem>, Log) {
        let log = Log::default();
        let names = NameSystem::new(&log);
        let mut factory = EntityFactory::new(config);
        factory.add_system(Arc::clone(&names));
        factory.add_system(Arc::new(ValueSystem {
            log: Arc::clone(&log),
        }));
        factory.register_def::<ValueSystem>(ValueDef::component_type_id());
        factory.register_component::<NameDef>();
        factory.register_component::<ValueDef>();
        factory.register_converter(TreeConverter::new());
        factory.register_converter(LegacyConverter::new(&["NameDef", "ValueDef"]));
        (factory, names, log)
    }

    /// Root "root" with a `ValueDef`, child "child" with grandchild "grandchild".
    fn sample_tree() -> BlueprintTree<'static> {
        let mut tree = BlueprintTree::new();
        tree.write(&name("root")).unwrap();
        tree.write(&ValueDef { value: 7 }).unwrap();
        let child = tree.new_child();
        child.write(&name("child")).unwrap();
        child.new_child().write(&name("grandchild")).unwrap();
        tree
    }

    fn loader_for(assets: Vec<(&str, Vec<u8>)>) -> impl AssetLoader + 'static {
        let assets: HashMap<String, Vec<u8>> = assets
            .into_iter()
            .map(|(name, bytes)| (name.to_string(), bytes))
            .collect();
        move |filename: &str| assets.get(filename).cloned()
    }

    #[test]
    fn test_create_yields_increasing_ids() {
        let mut factory = EntityFactory::default();
        let entities: Vec<Entity> = (0..100).map(|_| factory.create()).collect();
        assert!(entities.iter().all(|entity| entity.is_valid()));
        assert!(entities.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(entities[0], Entity(1));
        assert_eq!(factory.entity_to_blueprint_map().get(&entities[0]), Some(&String::new()));
    }

    #[test]
    fn test_tree_construction_order() {
        let (mut factory, _, log) = factory_with_systems(FactoryConfig::default());
        let mut tree = sample_tree();
        let root = factory.create_from_tree(&mut tree);
        assert_eq!(root, Entity(1));
        assert_eq!(
            entries(&log),
            [
                "create 1 root",
                "value 1 7",
                "create 2 child",
                "create 3 grandchild",
                "post 3 grandchild",
                "post 2 child",
                "post 1 root",
            ]
        );
    }

    #[test]
    fn test_unregistered_component_is_skipped() {
        let (mut factory, _, log) = factory_with_systems(FactoryConfig::default());
        let mut tree = BlueprintTree::new();
        tree.write(&UnknownDef { flag: true }).unwrap();
        tree.write(&name("still built")).unwrap();
        let entity = factory.create_from_tree(&mut tree);
        assert!(entity.is_valid());
        assert_eq!(entries(&log), ["create 1 still built", "post 1 still built"]);
    }

    #[test]
    fn test_create_from_blueprint_wraps_native_object() {
        let (mut factory, _, log) = factory_with_systems(FactoryConfig::default());
        let native = name("native");
        let mut blueprint = Blueprint::from_object(&native);
        let entity = factory.create_from_blueprint(&mut blueprint);
        assert_eq!(entity, Entity(1));
        assert_eq!(entries(&log), ["create 1 native", "post 1 native"]);
    }

    #[test]
    fn test_create_from_name_in_both_formats() {
        let (factory, _, _) = factory_with_systems(FactoryConfig::default());
        let tree_bytes = factory.finalize(&mut sample_tree());
        let legacy_bytes = factory.finalize_as(FileIdentifier::LEGACY, &mut sample_tree());
        assert_eq!(&tree_bytes[..4], b"BLPT");
        assert_eq!(&legacy_bytes[..4], b"ENTS");

        for (asset, bytes) in [("tree", tree_bytes), ("legacy", legacy_bytes)] {
            let (factory, _, log) = factory_with_systems(FactoryConfig::default());
            let mut factory = factory.with_asset_loader(loader_for(vec![("prefab.bin", bytes)]));
            let entity = factory.create_from_name("prefab");
            assert_eq!(entity, Entity(1), "{asset}");
            assert_eq!(
                entries(&log),
                [
                    "create 1 root",
                    "value 1 7",
                    "create 2 child",
                    "create 3 grandchild",
                    "post 3 grandchild",
                    "post 2 child",
                    "post 1 root",
                ],
                "{asset}"
            );
            assert_eq!(
                factory.entity_to_blueprint_map().get(&entity).map(String::as_str),
                Some("prefab")
            );
        }
    }

    #[test]
    fn test_create_from_name_failures_yield_null_entity() {
        let (factory, _, log) = factory_with_systems(FactoryConfig::default());
        let mut unknown = BlueprintTree::new();
        unknown.write(&name("x")).unwrap();
        let unknown = factory.finalize_as(FileIdentifier::BLUEPRINT, &mut unknown);
        let mut unknown_tagged = b"ZZZZ".to_vec();
        unknown_tagged.extend_from_slice(&unknown[4..]);

        let mut factory = factory.with_asset_loader(loader_for(vec![
            ("unknown.bin", unknown_tagged),
            ("short.bin", vec![1, 2]),
            ("corrupt.bin", b"BLPT\xc1".to_vec()),
        ]));
        assert_eq!(factory.create_from_name("missing"), Entity::INVALID);
        assert_eq!(factory.create_from_name("unknown"), Entity::INVALID);
        assert_eq!(factory.create_from_name("short"), Entity::INVALID);
        assert_eq!(factory.create_from_name("corrupt"), Entity::INVALID);
        assert!(entries(&log).is_empty());
    }

    #[test]
    fn test_create_without_converters_or_loader() {
        let mut factory = EntityFactory::default();
        assert_eq!(factory.create_from_name("anything"), Entity::INVALID);
        assert_eq!(factory.create_from_data(b"BLPT\x92\x90\x90", "raw"), Entity::INVALID);
    }

    #[test]
    fn test_create_from_data_and_populate() {
        let (mut factory, _, log) = factory_with_systems(FactoryConfig::default());
        let mut tree = BlueprintTree::new();
        tree.write(&name("data")).unwrap();
        let bytes = factory.finalize(&mut tree);

        let entity = factory.create_from_data(&bytes, "inline");
        assert_eq!(entity, Entity(1));

        let existing = factory.create();
        let mut extra = BlueprintTree::new();
        extra.write(&name("extra")).unwrap();
        assert_eq!(factory.populate_from_tree(existing, &mut extra), existing);
        assert_eq!(factory.populate_from_tree(Entity::INVALID, &mut extra), Entity::INVALID);
        assert_eq!(factory.populate_from_name(Entity::INVALID, "inline"), Entity::INVALID);

        assert_eq!(
            entries(&log),
            ["create 1 data", "post 1 data", "create 2 extra", "post 2 extra"]
        );
    }

    #[test]
    fn test_populate_from_name_uses_cache() {
        let (factory, _, log) = factory_with_systems(FactoryConfig::default());
        let mut tree = BlueprintTree::new();
        tree.write(&name("cached")).unwrap();
        let bytes = factory.finalize(&mut tree);

        let loads = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&loads);
        let mut factory = factory.with_asset_loader(move |filename: &str| {
            *counter.lock().unwrap() += 1;
            (filename == "cached.bin").then(|| bytes.clone())
        });
        let entity = factory.create();
        assert_eq!(factory.populate_from_name(entity, "cached"), entity);
        assert_eq!(factory.create_from_name("cached.bin"), Entity(2));
        assert_eq!(*loads.lock().unwrap(), 1);
        assert_eq!(
            factory.entity_to_blueprint_map().get(&entity).map(String::as_str),
            Some("cached")
        );

        assert!(factory.release_blueprint("cached"));
        assert!(!factory.release_blueprint("cached"));
        factory.create_from_name("cached");
        assert_eq!(*loads.lock().unwrap(), 2);
        assert_eq!(entries(&log).len(), 6);
    }

    #[test]
    fn test_destroy_and_queued_destroy() {
        let (mut factory, _, log) = factory_with_systems(FactoryConfig::default());
        let a = factory.create();
        let b = factory.create();
        let c = factory.create();

        factory.destroy(a);
        factory.destroy(Entity::INVALID);
        assert!(!factory.entity_to_blueprint_map().contains_key(&a));

        factory.queue_for_destruction(c);
        factory.queue_for_destruction(Entity::INVALID);
        factory.queue_for_destruction(b);
        assert_eq!(factory.destruction_queue().len(), 2);
        assert_eq!(entries(&log), ["destroy 1"]);

        factory.destroy_queued_entities();
        assert_eq!(entries(&log), ["destroy 1", "destroy 3", "destroy 2"]);
        assert!(factory.destruction_queue().is_empty());
        assert!(factory.entity_to_blueprint_map().is_empty());
    }

    #[test]
    fn test_queueing_during_drain_waits_for_next_drain() {
        let (mut factory, names, log) = factory_with_systems(FactoryConfig::default());
        let a = factory.create();
        let b = factory.create();
        names.requeue_on_destroy(a, b, factory.destruction_queue());

        factory.queue_for_destruction(a);
        factory.destroy_queued_entities();
        assert_eq!(entries(&log), ["destroy 1"]);
        assert_eq!(factory.destruction_queue().len(), 1);

        factory.destroy_queued_entities();
        assert_eq!(entries(&log), ["destroy 1", "destroy 2"]);

        factory.destroy_queued_entities();
        assert_eq!(entries(&log).len(), 2);
    }

    #[test]
    fn test_queue_from_other_threads() {
        let (mut factory, _, log) = factory_with_systems(FactoryConfig::default());
        let entities: Vec<Entity> = (0..400).map(|_| factory.create()).collect();

        std::thread::scope(|scope| {
            for chunk in entities.chunks(100) {
                let queue = factory.destruction_queue();
                scope.spawn(move || {
                    for &entity in chunk {
                        queue.queue_for_destruction(entity);
                    }
                });
            }
            for _ in 0..10 {
                factory.destroy_queued_entities();
            }
        });
        factory.destroy_queued_entities();

        let destroyed = entries(&log);
        assert_eq!(destroyed.len(), entities.len());
        let unique: HashSet<&String> = destroyed.iter().collect();
        assert_eq!(unique.len(), entities.len());
    }

    #[test]
    fn test_create_child_hook() {
        let (mut factory, _, _) = factory_with_systems(FactoryConfig::default());
        let links = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&links);
        factory.set_create_child_fn(move |factory, parent, child| {
            let entity = factory.create_from_tree(child);
            recorded.lock().unwrap().push((parent, entity));
            entity
        });
        factory.create_from_tree(&mut sample_tree());
        assert_eq!(
            *links.lock().unwrap(),
            [(Entity(2), Entity(3)), (Entity(1), Entity(2))]
        );
    }

    #[test]
    fn test_add_system_twice_keeps_first() {
        let log = Log::default();
        let first = NameSystem::new(&log);
        let second = NameSystem::new(&log);
        let mut factory = EntityFactory::default();
        factory.add_system(Arc::clone(&first));
        factory.add_system(Arc::clone(&second));

        factory.initialize();
        assert_eq!(*first.initialized.lock().unwrap(), 1);
        assert_eq!(*second.initialized.lock().unwrap(), 0);
    }

    #[test]
    fn test_initialize_without_systems_does_not_panic() {
        EntityFactory::default().initialize();
    }

    #[test]
    fn test_finalize_round_trip_and_fallback() {
        let (factory, _, _) = factory_with_systems(FactoryConfig::default());
        let bytes = factory.finalize(&mut sample_tree());
        let tree = TreeConverter::new().load(&bytes).unwrap();
        assert_eq!(tree.count(), 2);
        assert_eq!(tree.children().len(), 1);
        assert!(factory.finalize_as(FileIdentifier(*b"NONE"), &mut sample_tree()).is_empty());
        assert_eq!(
            factory.converter_def_types(FileIdentifier::LEGACY),
            [NameDef::component_type_id(), ValueDef::component_type_id()]
        );

        let mut fallback = EntityFactory::new(FactoryConfig::new().with_single_converter_fallback(true));
        fallback.register_converter(LegacyConverter::new(&["NameDef"]));
        let mut tree = fallback.new_tree();
        tree.write(&name("legacy")).unwrap();
        assert_eq!(&fallback.finalize(&mut tree)[..4], b"ENTS");
    }
}

//! The System contract.
//!
//! A System owns all data and behaviour for one or more component kinds.
//! The factory never stores component data itself: it routes each record of
//! a blueprint to the System registered for the record's def type.

use std::any::Any;

use engine_blueprint::Blueprint;
use engine_component::{ComponentTypeId, Entity};

/// A component-owning System.
///
/// Systems are shared with the rest of the application, so every method
/// takes `&self`; implementations keep their state behind their own locks.
pub trait System: Any + Send + Sync {
    /// Called once by [`EntityFactory::initialize`](crate::EntityFactory::initialize).
    fn initialize(&self) {}

    /// Create the component described by the current record of `blueprint`
    /// on `entity`.
    fn create_component(&self, entity: Entity, blueprint: &Blueprint<'_>);

    /// Called for every record of an entity after the entity and all of its
    /// children have been created.
    fn post_create_component(&self, _entity: Entity, _blueprint: &Blueprint<'_>) {}

    /// Remove everything this System holds for `entity`.
    fn destroy(&self, entity: Entity);

    /// Def types this System owns. Registered when the System is added.
    fn def_types(&self) -> Vec<ComponentTypeId> {
        Vec::new()
    }
}

//! # engine_component
//!
//! Defines what a component is and how entities are identified.
//!
//! This crate provides:
//!
//! - [`Component`] trait — the contract all schema-described data must satisfy.
//! - [`ComponentTypeId`] — the FNV-1a def-type hash of a schema name.
//! - [`Entity`] — lightweight `u64` entity identifiers.
//! - [`EntityAllocator`] — monotonically increasing ID allocator.

pub mod component;
pub mod entity;

pub use component::{Component, ComponentTypeId, fnv1a};
pub use entity::{Entity, EntityAllocator};

//! # engine_factory
//!
//! Builds entities out of blueprint assets.
//!
//! - [`EntityFactory`] — allocates entities, dispatches component records to
//!   [`System`]s, and serialises trees back into assets.
//! - [`System`] — the contract a component-owning System implements.
//! - [`AssetLoader`] / [`BlueprintCache`] — where blueprint bytes come from.
//! - [`DestructionQueue`] — queue entities for destruction from any thread.
//! - [`FactoryConfig`] — filename and buffer settings.

pub mod asset;
pub mod config;
pub mod error;
pub mod factory;
pub mod system;

pub use asset::{AssetLoader, BlueprintCache, DirectoryLoader};
pub use config::FactoryConfig;
pub use error::FactoryError;
pub use factory::{CreateChildFn, DestructionQueue, EntityFactory};
pub use system::System;

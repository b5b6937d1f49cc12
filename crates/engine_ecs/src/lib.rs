//! # engine_ecs
//!
//! The entity registry: the substrate every other subsystem builds on.
//!
//! A [`Registry`] hands out entity ids, stores component values, and keeps
//! each registered [`System`] informed of exactly which active entities carry
//! the components it requires. Creation and destruction are deferred and
//! applied together by [`Registry::update`], so nothing a system iterates over
//! changes underneath it within a tick.
//!
//! This crate provides:
//!
//! - [`Registry`]: entity lifecycle, components, systems, tags and groups.
//! - [`System`] / [`SystemBase`]: the membership contract for systems.
//! - [`Parent`] / [`Children`]: id-based hierarchy and the runtime kill cascade.
//! - [`LifecycleListener`] and [`EntityCloner`]: hooks for collaborators.
//! - [`StashedEntity`]: entities preserved across a scene reload.
//!
//! ## Usage
//!
//! ```rust
//! use engine_ecs::{Registry, Transform};
//!
//! let mut registry = Registry::new();
//! let player = registry.create_entity();
//! registry.tag_entity(player, "player")?;
//!
//! // Not visible to systems until the flush.
//! registry.update();
//! assert!(registry.is_active(player));
//! assert_eq!(registry.get_component::<Transform>(player), Some(&Transform::IDENTITY));
//!
//! registry.kill_entity(player);
//! registry.update();
//! assert_eq!(registry.create_entity(), player);
//! # Ok::<(), engine_ecs::EcsError>(())
//! ```

pub mod builtin;
pub mod clone;
pub mod config;
pub mod error;
pub mod handle;
pub mod hierarchy;
mod index;
pub mod lifecycle;
pub mod registry;
pub mod stash;
pub mod system;

pub use builtin::{Active, Transform};
pub use clone::{DeepCloner, EntityCloner};
pub use config::{BaselineComponent, RegistryConfig};
pub use engine_component::{
    Component, ComponentTypeId, ComponentTypes, Entity, MAX_COMPONENTS, Signature,
};
pub use error::EcsError;
pub use handle::EntityMut;
pub use hierarchy::{Children, Parent};
pub use lifecycle::{LifecycleListener, TracingListener};
pub use registry::{MAX_ID_GAP, Registry, UpdateSummary};
pub use stash::StashedEntity;
pub use system::{AsAny, System, SystemBase};

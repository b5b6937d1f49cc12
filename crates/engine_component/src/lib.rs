//! # engine_component
//!
//! The "C" in ECS: what a component is, how component types are numbered, and
//! how component values are stored.
//!
//! This crate provides:
//!
//! - [`Entity`]: lightweight `u32` entity identifiers.
//! - [`Component`]: the contract all entity data must satisfy.
//! - [`ComponentTypes`]: per-registry table assigning each component type a bit.
//! - [`Signature`]: fixed-width bitset of component-type membership.
//! - [`ComponentPool`] / [`AnyPool`]: typed and type-erased sparse-set storage.

pub mod component;
pub mod entity;
pub mod error;
pub mod pool;
pub mod signature;

pub use component::{Component, ComponentMeta, ComponentTypeId, ComponentTypes};
pub use entity::Entity;
pub use error::ComponentError;
pub use pool::{AnyPool, ComponentPool};
pub use signature::{MAX_COMPONENTS, Signature};

//! Entity/component storage
//!
//! Entities are plain ids handed out by a [`World`]; components live in per-type
//! [`ComponentStore`]s owned by the scene.

pub mod component;
pub mod entity;
pub mod storage;
pub mod world;

pub use component::Component;
pub use entity::{Entity, EntityFlags, EntityId};
pub use storage::{ComponentStore, StoreError};
pub use world::World;

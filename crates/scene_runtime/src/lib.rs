//! # Scene Runtime
//!
//! Loads s72 scene files into an entity/component scene graph and evaluates it every
//! frame for a renderer.
//!
//! ## Features
//!
//! - **JSON**: Hand-written parser with a fast tier and a checked tier
//! - **ECS**: Append-only component stores with explicit aliasing of shared components
//! - **Scene Graph**: Two-pass construction with name-based de-duplication
//! - **Meshes**: Packed or strided attribute decoding into a shared geometry sink
//! - **Animation**: STEP, LINEAR and SLERP keyframe drivers
//! - **Culling**: Plane-based frustum test against mesh bounds
//! - **Orbit Camera**: Spherical user camera
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_runtime::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let params = ModeParameters::new("sg-Articulation.s72");
//!     let mut world = World::new();
//!     let mut buffers = GeometryBuffers::new();
//!
//!     let mut scene = Scene::load(&params, &mut world, &mut buffers)?;
//!     scene.add_orbit_camera(&mut world);
//!
//!     scene.update_drivers(0.5);
//!     let frame = scene.draw_scene()?;
//!     println!("{} draws", frame.draws.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::cast_possible_truncation)]

pub mod assets;
pub mod config;
pub mod ecs;
pub mod foundation;
pub mod json;
pub mod scene;

/// Common imports for runtime users
pub mod prelude {
    pub use crate::{
        assets::{GeometryBuffers, GeometrySink, IndexRange, SearchPaths, Vertex},
        config::{Config, ModeParameters, ValidationLevel},
        ecs::{ComponentStore, Entity, EntityFlags, EntityId, World},
        foundation::math::{Mat4, Quat, Transform, Vec3},
        json::{Object, Value},
        scene::{Camera, DrawCommand, Driver, FrameDraws, Mesh, OrbitControl, OrbitInput, Scene, SceneError, SceneNode},
    };
}

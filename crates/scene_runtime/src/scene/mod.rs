//! Scene runtime
//!
//! ```text
//! s72 document
//!      ↓
//! SceneBuilder (two passes, name tables)
//!      ↓
//! Scene (graph + component stores)
//!      ↓ per frame
//! update_drivers → draw_scene → renderer
//! ```
//!
//! The graph is a forest of [`SceneNode`]s linked by entity id through first-child
//! and next-sibling links. Components sit in per-type stores on the [`Scene`]; nodes
//! that name the same mesh, material, camera, light or environment share one stored
//! instance.

pub mod animation;
pub mod bounds;
mod builder;
pub mod components;
pub mod orbit;
#[allow(clippy::module_inception)]
mod scene;

pub use animation::{AnimationError, Channel, ChannelValue, Driver, Interpolation};
pub use bounds::{frustum_cull, Bounds, Frustum, Plane, MIN_AXIS_SIZE};
pub use builder::{ObjectType, SceneBuilder, SceneError};
pub use components::{
    Camera, Environment, Light, LightKind, Material, MaterialKind, MaterialValue, Mesh, SceneNode,
};
pub use orbit::{OrbitControl, OrbitInput};
pub use scene::{DrawCommand, FrameDraws, Scene};

//! Asset loading
//!
//! Everything that touches files other than the scene document itself: locating
//! them, decoding vertex and index streams, and handing the results to the
//! renderer-owned geometry buffers.

pub mod mesh_loader;
pub mod resolve;
pub mod vertex;

pub use mesh_loader::{AttributeFormat, AttributeName, IndexFormat, MeshError, MeshLoader};
pub use resolve::{NotFound, SearchPaths};
pub use vertex::{GeometryBuffers, GeometrySink, IndexRange, Vertex};

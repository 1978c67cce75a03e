//! Math utilities and types
//!
//! Thin aliases over `nalgebra` plus the node [`Transform`] used by the scene graph.
//! Conventions: right-handed, column vectors, quaternions applied as `q * v`.

pub use nalgebra::{Matrix4, Quaternion, Unit, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Local transform of a scene node: rotation, translation and scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Translation relative to the parent
    pub translation: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Per-axis scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a unit-scale transform from an orientation and a position
    pub fn from_orientation_position(rotation: Quat, translation: Vec3) -> Self {
        Self {
            translation,
            rotation,
            ..Default::default()
        }
    }

    /// Matrix taking local coordinates into the parent's space (`T * R * S`)
    pub fn local_to_parent(&self) -> Mat4 {
        Mat4::new_translation(&self.translation)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Inverse of [`Transform::local_to_parent`]
    ///
    /// A zero scale axis is treated as 1 so the result stays finite.
    pub fn parent_to_local(&self) -> Mat4 {
        let safe = self.scale.map(|s| if s == 0.0 { 1.0 } else { s });
        Mat4::new_nonuniform_scaling(&safe.map(f32::recip))
            * self.rotation.inverse().to_homogeneous()
            * Mat4::new_translation(&(-self.translation))
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// 2 * Pi
    pub const TAU: f32 = 2.0 * PI;

    /// Pi / 2
    pub const HALF_PI: f32 = PI * 0.5;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Quat, Quaternion};

    /// Normalize `q` into a rotation; a zero-length quaternion becomes the identity
    pub fn rotation_or_identity(q: Quaternion<f32>) -> Quat {
        Quat::try_new(q, f32::EPSILON).unwrap_or_else(Quat::identity)
    }

    /// Wrap an angle into `[0, TAU)`
    pub fn wrap_angle(radians: f32) -> f32 {
        radians.rem_euclid(constants::TAU)
    }
}

/// Extension trait for Mat4 with camera construction helpers
pub trait Mat4Ext {
    /// Right-handed perspective projection with clip depth in `[-1, 1]`
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_perspective(aspect, fov_y, near, far)
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
    }
}

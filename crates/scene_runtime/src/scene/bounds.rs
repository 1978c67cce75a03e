//! Bounding boxes and frustum culling
//!
//! Mesh bounds are kept in mesh-local space. Culling moves the 8 box corners into
//! world space with the model matrix and tests them against planes extracted from
//! `proj * view` (Gribb-Hartmann). A box is rejected only when all 8 corners lie
//! behind a single plane. That is conservative: boxes straddling a frustum corner
//! can be kept even though they are invisible, which is acceptable for a renderer
//! that favors a cheap test.

use crate::foundation::math::{Mat4, Point3, Vec3, Vec4};

/// Narrowest extent [`Bounds::fix_zero_volume`] leaves on any axis
pub const MIN_AXIS_SIZE: f32 = 0.001;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::empty()
    }
}

impl Bounds {
    /// Create a new box from min and max points
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// A box enclosing nothing; the first `enclose` snaps it to that point
    pub fn empty() -> Self {
        Self {
            min: Vec3::repeat(f32::INFINITY),
            max: Vec3::repeat(f32::NEG_INFINITY),
        }
    }

    /// Whether nothing has been enclosed yet
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow to include a point
    pub fn enclose_point(&mut self, point: Vec3) {
        self.min = self.min.inf(&point);
        self.max = self.max.sup(&point);
    }

    /// Grow to include another box
    pub fn enclose(&mut self, other: &Self) {
        if !other.is_empty() {
            self.enclose_point(other.min);
            self.enclose_point(other.max);
        }
    }

    /// Pad every axis narrower than [`MIN_AXIS_SIZE`] around its center.
    ///
    /// An empty box becomes a minimum-size box at the origin.
    pub fn fix_zero_volume(&mut self) {
        if self.is_empty() {
            self.min = Vec3::zeros();
            self.max = Vec3::zeros();
        }
        for axis in 0..3 {
            if self.max[axis] - self.min[axis] < MIN_AXIS_SIZE {
                let center = (self.max[axis] + self.min[axis]) * 0.5;
                self.min[axis] = center - MIN_AXIS_SIZE * 0.5;
                self.max[axis] = center + MIN_AXIS_SIZE * 0.5;
            }
        }
    }

    /// Get the center of the box
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Check if this box contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        (0..3).all(|axis| point[axis] >= self.min[axis] && point[axis] <= self.max[axis])
    }

    /// The 8 corners; bit 0 of the index selects max x, bit 1 max y, bit 2 max z
    pub fn corners(&self) -> [Vec3; 8] {
        std::array::from_fn(|i| {
            Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            )
        })
    }

    /// Corners moved by `matrix`, in [`Bounds::corners`] order
    pub fn transformed_corners(&self, matrix: &Mat4) -> [Vec3; 8] {
        self.corners()
            .map(|corner| matrix.transform_point(&Point3::from(corner)).coords)
    }

    /// Axis-aligned box enclosing this box after `matrix` is applied
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let mut out = Self::empty();
        for corner in self.transformed_corners(matrix) {
            out.enclose_point(corner);
        }
        out
    }
}

/// Plane `normal · p + distance = 0`; positive values lie inside the frustum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal pointing into the frustum
    pub normal: Vec3,
    /// Offset from the origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Create a plane from a normal and distance
    pub const fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }

    /// Plane from `(a, b, c, d)` coefficients, normalized when possible
    pub fn from_coefficients(coefficients: Vec4) -> Self {
        let normal = coefficients.xyz();
        let length = normal.norm();
        if length > f32::EPSILON {
            Self::new(normal / length, coefficients.w / length)
        } else {
            Self::new(normal, coefficients.w)
        }
    }

    /// Signed distance from the plane to a point
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.distance
    }
}

/// Six clip planes: left, right, bottom, top, near, far
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    /// Planes in left, right, bottom, top, near, far order
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extract planes from a combined `proj * view` matrix.
    ///
    /// Assumes clip-space depth in `[-w, w]`, matching
    /// [`Mat4Ext::perspective`](crate::foundation::math::Mat4Ext::perspective).
    pub fn from_matrix(view_proj: &Mat4) -> Self {
        let row = |i: usize| -> Vec4 { view_proj.row(i).transpose() };
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));
        Self {
            planes: [
                Plane::from_coefficients(r3 + r0),
                Plane::from_coefficients(r3 - r0),
                Plane::from_coefficients(r3 + r1),
                Plane::from_coefficients(r3 - r1),
                Plane::from_coefficients(r3 + r2),
                Plane::from_coefficients(r3 - r2),
            ],
        }
    }

    /// Frustum of a camera given its projection and view matrices
    pub fn from_camera(projection: &Mat4, view: &Mat4) -> Self {
        Self::from_matrix(&(projection * view))
    }

    /// Whether a point is on the inner side of every plane
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|plane| plane.distance_to_point(point) >= 0.0)
    }

    /// Conservative visibility test for a local-space box placed by `model`.
    /// Returns `false` only when all 8 world corners are behind one plane.
    pub fn intersects_bounds(&self, local: &Bounds, model: &Mat4) -> bool {
        let corners = local.transformed_corners(model);
        self.planes.iter().all(|plane| {
            corners
                .iter()
                .any(|&corner| plane.distance_to_point(corner) >= 0.0)
        })
    }
}

/// Whether a mesh with local `bounds` and `model` matrix may be visible
pub fn frustum_cull(frustum: &Frustum, bounds: &Bounds, model: &Mat4) -> bool {
    frustum.intersects_bounds(bounds, model)
}

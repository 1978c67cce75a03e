//! Orbit camera control
//!
//! Spherical camera state around a pivot in a Z-up world. The control itself never
//! touches the graph; the scene derives the camera node's transform from it after
//! every update.

use crate::ecs::Component;
use crate::foundation::math::{constants, utils, Quat, Vec3};

/// Per-frame user input driving an [`OrbitControl`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrbitInput {
    /// Zoom; positive moves toward the orbit point
    pub scroll: f32,
    /// Horizontal turn
    pub turn_h: f32,
    /// Vertical turn
    pub turn_v: f32,
    /// Horizontal pan along the camera's side axis
    pub pan_h: f32,
    /// Vertical pan along world Z
    pub pan_v: f32,
}

/// Spherical orbit camera state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitControl {
    /// Point the camera circles around
    pub orbit_point: Vec3,
    /// Angle around Z, radians in `[0, 2pi)`
    pub azimuth: f32,
    /// Angle above the XY plane, radians in `[-pi/2, pi/2]`
    pub altitude: f32,
    /// Distance from the orbit point
    pub distance: f32,
}

impl Component for OrbitControl {}

impl Default for OrbitControl {
    fn default() -> Self {
        Self {
            orbit_point: Vec3::zeros(),
            azimuth: 0.0,
            altitude: 0.0,
            distance: 3.0,
        }
    }
}

impl OrbitControl {
    /// Radians per unit of turn input
    pub const TURN_FACTOR: f32 = 4.0;
    /// Pan distance per unit of input, scaled by the orbit distance
    pub const MOVE_FACTOR: f32 = 0.75;
    /// Fraction of the distance covered per unit of scroll
    pub const SCROLL_FACTOR: f32 = 0.1;
    /// Closest the camera may get to the orbit point
    pub const MIN_DISTANCE: f32 = 0.05;

    /// Apply one frame of input
    pub fn update(&mut self, input: &OrbitInput) {
        self.distance -= input.scroll * self.distance * Self::SCROLL_FACTOR;
        self.distance = self.distance.max(Self::MIN_DISTANCE);

        self.azimuth = utils::wrap_angle(self.azimuth - input.turn_h * Self::TURN_FACTOR);
        self.altitude = (self.altitude + input.turn_v * Self::TURN_FACTOR)
            .clamp(-constants::HALF_PI, constants::HALF_PI);

        let step = self.distance * Self::MOVE_FACTOR;
        self.orbit_point.z += input.pan_v * step;
        if input.pan_h != 0.0 {
            self.orbit_point -= input.pan_h * step * self.side_axis();
        }
    }

    /// Horizontal axis perpendicular to the viewing direction
    fn side_axis(&self) -> Vec3 {
        let xy = Vec3::new(self.azimuth.cos(), self.azimuth.sin(), 0.0).normalize();
        (-xy).cross(&Vec3::z())
    }

    /// Unit vector from the orbit point toward the camera
    pub fn direction(&self) -> Vec3 {
        let (sin_alt, cos_alt) = self.altitude.sin_cos();
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        Vec3::new(cos_alt * cos_az, cos_alt * sin_az, sin_alt)
    }

    /// Camera orientation and world position. The camera looks down its local -Z
    /// toward the orbit point with local +Y tilted toward world +Z.
    pub fn to_orientation_position(&self) -> (Quat, Vec3) {
        let position = self.orbit_point + self.distance * self.direction();
        let yaw = Quat::from_axis_angle(&Vec3::z_axis(), constants::HALF_PI + self.azimuth);
        let pitch = Quat::from_axis_angle(&Vec3::x_axis(), constants::HALF_PI - self.altitude);
        (yaw * pitch, position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_faces_origin_from_positive_x() {
        let (rotation, position) = OrbitControl::default().to_orientation_position();
        assert_relative_eq!(position, Vec3::new(3.0, 0.0, 0.0), epsilon = 1e-6);

        let forward = rotation * -Vec3::z();
        assert_relative_eq!(forward, Vec3::new(-1.0, 0.0, 0.0), epsilon = 1e-6);
        let up = rotation * Vec3::y();
        assert_relative_eq!(up, Vec3::z(), epsilon = 1e-6);
    }

    #[test]
    fn test_camera_always_looks_at_orbit_point() {
        let orbit = OrbitControl {
            orbit_point: Vec3::new(1.0, -2.0, 0.5),
            azimuth: 1.1,
            altitude: 0.4,
            distance: 5.0,
        };
        let (rotation, position) = orbit.to_orientation_position();
        let forward = rotation * -Vec3::z();
        let to_pivot = (orbit.orbit_point - position).normalize();
        assert_relative_eq!(forward, to_pivot, epsilon = 1e-5);
    }

    #[test]
    fn test_scroll_clamps_to_min_distance() {
        let mut orbit = OrbitControl::default();
        orbit.update(&OrbitInput {
            scroll: 1.0,
            ..Default::default()
        });
        assert_relative_eq!(orbit.distance, 2.7, epsilon = 1e-6);

        orbit.update(&OrbitInput {
            scroll: 100.0,
            ..Default::default()
        });
        assert_relative_eq!(orbit.distance, OrbitControl::MIN_DISTANCE);
    }

    #[test]
    fn test_turn_wraps_and_clamps() {
        let mut orbit = OrbitControl::default();
        orbit.update(&OrbitInput {
            turn_h: 0.25,
            turn_v: 1.0,
            ..Default::default()
        });
        assert_relative_eq!(orbit.azimuth, constants::TAU - 1.0, epsilon = 1e-5);
        assert_relative_eq!(orbit.altitude, constants::HALF_PI);
    }

    #[test]
    fn test_pan() {
        let mut orbit = OrbitControl::default();
        orbit.update(&OrbitInput {
            pan_v: 1.0,
            ..Default::default()
        });
        assert_relative_eq!(orbit.orbit_point, Vec3::new(0.0, 0.0, 2.25), epsilon = 1e-6);

        let mut orbit = OrbitControl::default();
        orbit.update(&OrbitInput {
            pan_h: 1.0,
            ..Default::default()
        });
        // side axis at azimuth 0 is cross(-X, Z) = +Y
        assert_relative_eq!(orbit.orbit_point, Vec3::new(0.0, -2.25, 0.0), epsilon = 1e-6);
    }
}

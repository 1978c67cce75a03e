//! Keyframe drivers
//!
//! A driver animates one channel (translation, rotation or scale) of one node. Its
//! `values` are flattened per keyframe: 3 floats for translation/scale, 4 for rotation
//! in `(x, y, z, w)` order. Playback loops with the period of the last keyframe time.

use crate::ecs::{Component, EntityId};
use crate::foundation::math::{utils, Quat, Quaternion, Transform, Vec3};
use crate::json::{JsonError, Object};

/// Driver construction and validation errors
#[derive(thiserror::Error, Debug)]
pub enum AnimationError {
    /// Channel other than translation/rotation/scale
    #[error("unknown driver channel: {0}")]
    UnknownChannel(String),

    /// Interpolation other than STEP/LINEAR/SLERP
    #[error("unknown interpolation mode: {0}")]
    UnknownInterpolation(String),

    /// Driver object had the wrong shape
    #[error("JSON error: {0}")]
    Json(#[from] JsonError),
}

/// Transform field a driver writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// `Transform::translation`
    Translation,
    /// `Transform::rotation`
    Rotation,
    /// `Transform::scale`
    Scale,
}

impl Channel {
    /// Parse an s72 channel name
    pub fn parse(name: &str) -> Result<Self, AnimationError> {
        match name {
            "translation" => Ok(Self::Translation),
            "rotation" => Ok(Self::Rotation),
            "scale" => Ok(Self::Scale),
            other => Err(AnimationError::UnknownChannel(other.to_string())),
        }
    }

    /// Floats per keyframe sample
    pub const fn width(self) -> usize {
        match self {
            Self::Translation | Self::Scale => 3,
            Self::Rotation => 4,
        }
    }
}

/// How values between keyframes are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Hold the earlier keyframe
    Step,
    /// Componentwise blend
    #[default]
    Linear,
    /// Spherical blend for rotations; behaves as `Linear` on vectors
    Slerp,
}

impl Interpolation {
    /// Parse an s72 interpolation name
    pub fn parse(name: &str) -> Result<Self, AnimationError> {
        match name {
            "STEP" => Ok(Self::Step),
            "LINEAR" => Ok(Self::Linear),
            "SLERP" => Ok(Self::Slerp),
            other => Err(AnimationError::UnknownInterpolation(other.to_string())),
        }
    }
}

/// Sampled channel value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelValue {
    /// Translation or scale
    Vector(Vec3),
    /// Rotation
    Rotation(Quat),
}

/// Keyframe track bound to one entity and one channel
#[derive(Debug, Clone, PartialEq)]
pub struct Driver {
    /// Name of the DRIVER object
    pub name: String,
    /// Entity whose transform is written
    pub entity_id: EntityId,
    /// Field written
    pub channel: Channel,
    /// Blend mode
    pub interpolation: Interpolation,
    /// Strictly increasing keyframe times in seconds
    pub times: Vec<f32>,
    /// Flattened samples, `times.len() * channel.width()` floats
    pub values: Vec<f32>,
}

impl Component for Driver {}

impl Driver {
    /// Read a DRIVER object targeting `entity_id`. `interpolation` defaults to LINEAR.
    pub fn from_json(obj: &Object, entity_id: EntityId) -> Result<Self, AnimationError> {
        let interpolation = match obj.get("interpolation") {
            Some(value) => Interpolation::parse(value.as_string()?)?,
            None => Interpolation::default(),
        };
        Ok(Self {
            name: obj.string("name")?.to_string(),
            entity_id,
            channel: Channel::parse(obj.string("channel")?)?,
            interpolation,
            times: obj.floats("times")?,
            values: obj.floats("values")?,
        })
    }

    /// Check times are non-empty and strictly increasing and that every keyframe
    /// has a complete sample
    pub fn validate(&self) -> Result<(), String> {
        if self.times.is_empty() {
            return Err("driver has no keyframes".to_string());
        }
        if let Some(pair) = self.times.windows(2).find(|w| w[1] <= w[0]) {
            return Err(format!("times not strictly increasing at {} -> {}", pair[0], pair[1]));
        }
        let expected = self.times.len() * self.channel.width();
        if self.values.len() != expected {
            return Err(format!(
                "expected {expected} values for {} keyframes, found {}",
                self.times.len(),
                self.values.len()
            ));
        }
        Ok(())
    }

    /// Keyframe pair around `elapsed` (looped) and the blend fraction between them
    pub fn bracket(&self, elapsed: f32) -> (usize, usize, f32) {
        let Some(&period) = self.times.last() else {
            return (0, 0, 0.0);
        };
        let t_mod = if period > 0.0 { elapsed.rem_euclid(period) } else { 0.0 };

        let upper = self.times.partition_point(|&t| t <= t_mod);
        if upper == 0 {
            return (0, 0, 0.0);
        }
        let lower = upper - 1;
        if upper >= self.times.len() {
            return (lower, lower, 0.0);
        }

        let span = self.times[upper] - self.times[lower];
        let t = if span > 0.0 {
            (t_mod - self.times[lower]) / span
        } else {
            0.0
        };
        (lower, upper, t)
    }

    /// Sample `key` as stored, except that rotations are normalized (zero ones become
    /// the identity)
    fn sample_at(&self, key: usize) -> Option<ChannelValue> {
        let width = self.channel.width();
        let v = self.values.get(key * width..(key + 1) * width)?;
        Some(match self.channel {
            Channel::Rotation => {
                ChannelValue::Rotation(utils::rotation_or_identity(Quaternion::new(v[3], v[0], v[1], v[2])))
            }
            Channel::Translation | Channel::Scale => ChannelValue::Vector(Vec3::new(v[0], v[1], v[2])),
        })
    }

    /// Value at `elapsed` seconds, or `None` when the samples are incomplete
    pub fn sample(&self, elapsed: f32) -> Option<ChannelValue> {
        let (lower, upper, t) = self.bracket(elapsed);
        let a = self.sample_at(lower)?;
        let b = self.sample_at(upper)?;
        Some(interpolate(self.interpolation, a, b, t))
    }

    /// Evaluate at `elapsed` and write the result into `transform`
    pub fn apply(&self, elapsed: f32, transform: &mut Transform) {
        match self.sample(elapsed) {
            Some(ChannelValue::Vector(v)) if self.channel == Channel::Translation => {
                transform.translation = v;
            }
            Some(ChannelValue::Vector(v)) => transform.scale = v,
            Some(ChannelValue::Rotation(q)) => transform.rotation = q,
            None => log::trace!("Driver {} has incomplete samples", self.name),
        }
    }
}

/// Blend two samples of the same channel
pub fn interpolate(mode: Interpolation, a: ChannelValue, b: ChannelValue, t: f32) -> ChannelValue {
    match (mode, a, b) {
        (Interpolation::Step, a, _) => a,
        (_, ChannelValue::Vector(a), ChannelValue::Vector(b)) => ChannelValue::Vector(a.lerp(&b, t)),
        (Interpolation::Linear, ChannelValue::Rotation(a), ChannelValue::Rotation(b)) => {
            ChannelValue::Rotation(utils::rotation_or_identity(Quaternion::from(
                a.coords * (1.0 - t) + b.coords * t,
            )))
        }
        (Interpolation::Slerp, ChannelValue::Rotation(a), ChannelValue::Rotation(b)) => {
            ChannelValue::Rotation(slerp(a, b, t))
        }
        (_, a, _) => a,
    }
}

/// Spherical interpolation with the dot product clamped to `[0, 1]`.
///
/// Rotations in opposite hemispheres are not flipped to the short arc. A zero angle
/// returns `a` unchanged.
pub fn slerp(a: Quat, b: Quat, t: f32) -> Quat {
    let cos_theta = a.coords.dot(&b.coords).clamp(0.0, 1.0);
    let angle = cos_theta.acos();
    if angle == 0.0 {
        return a;
    }
    let sin = angle.sin();
    let wa = ((1.0 - t) * angle).sin() / sin;
    let wb = (t * angle).sin() / sin;
    utils::rotation_or_identity(Quaternion::from(a.coords * wa + b.coords * wb))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn driver(channel: Channel, interpolation: Interpolation, times: &[f32], values: &[f32]) -> Driver {
        Driver {
            name: "d".to_string(),
            entity_id: 0,
            channel,
            interpolation,
            times: times.to_vec(),
            values: values.to_vec(),
        }
    }

    fn quat_about_z(angle: f32) -> Quat {
        Quat::from_axis_angle(&Vec3::z_axis(), angle)
    }

    #[test]
    fn test_bracket_finds_pair_and_fraction() {
        let d = driver(Channel::Scale, Interpolation::Linear, &[0.0, 1.0, 3.0], &[0.0; 9]);
        assert_eq!(d.bracket(0.5), (0, 1, 0.5));
        let (lower, upper, t) = d.bracket(2.0);
        assert_eq!((lower, upper), (1, 2));
        assert_relative_eq!(t, 0.5);
    }

    #[test]
    fn test_playback_wraps_by_last_time() {
        let d = driver(
            Channel::Translation,
            Interpolation::Linear,
            &[0.0, 1.0, 2.0],
            &[0.0, 0.0, 0.0, 2.0, 4.0, 6.0, 0.0, 0.0, 0.0],
        );
        let mut looped = Transform::default();
        let mut first = Transform::default();
        d.apply(2.5, &mut looped);
        d.apply(0.5, &mut first);
        assert_relative_eq!(looped.translation, first.translation);
        assert_relative_eq!(first.translation, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_constant_values_wrap_to_same_transform() {
        let d = driver(
            Channel::Rotation,
            Interpolation::Slerp,
            &[0.0, 1.0, 2.0],
            &[0.0f32, 0.0, 0.0, 1.0].repeat(3),
        );
        let mut a = Transform::default();
        let mut b = Transform::default();
        d.apply(2.5, &mut a);
        d.apply(0.5, &mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_single_keyframe_holds_value() {
        let d = driver(Channel::Scale, Interpolation::Linear, &[0.0], &[2.0, 2.0, 2.0]);
        assert_eq!(d.sample(7.0), Some(ChannelValue::Vector(Vec3::repeat(2.0))));
    }

    #[test]
    fn test_rotation_samples_are_xyzw() {
        let d = driver(Channel::Rotation, Interpolation::Step, &[0.0, 1.0], &[0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        let Some(ChannelValue::Rotation(q)) = d.sample(0.25) else {
            panic!("expected a rotation");
        };
        assert_relative_eq!(q.w, 0.0);
        assert_relative_eq!(q.k, 1.0);
    }

    #[test]
    fn test_zero_rotation_sample_is_identity() {
        let d = driver(Channel::Rotation, Interpolation::Step, &[0.0, 1.0], &[0.0f32; 8]);
        assert_eq!(d.sample(0.5), Some(ChannelValue::Rotation(Quat::identity())));

        let linear = driver(Channel::Rotation, Interpolation::Linear, &[0.0, 1.0], &[0.0f32; 8]);
        let mut transform = Transform::default();
        linear.apply(0.5, &mut transform);
        assert_eq!(transform.rotation, Quat::identity());
    }

    #[test]
    fn test_opposite_rotations_blend_linearly_to_identity() {
        // q and -q average to zero halfway
        let d = driver(
            Channel::Rotation,
            Interpolation::Linear,
            &[0.0, 1.0],
            &[0.0, 0.0, 1.0, 0.0, 0.0, 0.0, -1.0, 0.0],
        );
        assert_eq!(d.sample(0.5), Some(ChannelValue::Rotation(Quat::identity())));
    }

    #[test]
    fn test_slerp_endpoints() {
        let a = quat_about_z(0.2);
        let b = quat_about_z(1.4);
        assert_relative_eq!(slerp(a, b, 0.0), a, epsilon = 1e-6);
        assert_relative_eq!(slerp(a, b, 1.0), b, epsilon = 1e-6);
        assert_relative_eq!(slerp(a, b, 0.5), quat_about_z(0.8), epsilon = 1e-5);
    }

    #[test]
    fn test_slerp_identical_returns_a() {
        let a = quat_about_z(0.7);
        assert_eq!(slerp(a, a, 0.3), a);
    }

    #[test]
    fn test_step_holds_lower_sample() {
        let a = ChannelValue::Rotation(quat_about_z(0.0));
        let b = ChannelValue::Rotation(quat_about_z(1.0));
        for t in [0.0, 0.25, 0.5, 0.99] {
            assert_eq!(interpolate(Interpolation::Step, a, b, t), a);
        }
        let va = ChannelValue::Vector(Vec3::zeros());
        let vb = ChannelValue::Vector(Vec3::repeat(1.0));
        assert_eq!(interpolate(Interpolation::Step, va, vb, 0.75), va);
    }

    #[test]
    fn test_linear_vectors() {
        let a = ChannelValue::Vector(Vec3::zeros());
        let b = ChannelValue::Vector(Vec3::new(4.0, 0.0, -2.0));
        assert_eq!(
            interpolate(Interpolation::Linear, a, b, 0.25),
            ChannelValue::Vector(Vec3::new(1.0, 0.0, -0.5))
        );
    }

    #[test]
    fn test_validate() {
        let ok = driver(Channel::Scale, Interpolation::Linear, &[0.0, 1.0], &[1.0; 6]);
        assert!(ok.validate().is_ok());
        let unordered = driver(Channel::Scale, Interpolation::Linear, &[1.0, 1.0], &[1.0; 6]);
        assert!(unordered.validate().is_err());
        let short = driver(Channel::Rotation, Interpolation::Slerp, &[0.0, 1.0], &[1.0; 6]);
        assert!(short.validate().is_err());
    }

    #[test]
    fn test_incomplete_samples_leave_transform_alone() {
        let d = driver(Channel::Translation, Interpolation::Linear, &[0.0, 1.0], &[1.0, 1.0, 1.0]);
        let mut transform = Transform::default();
        d.apply(0.5, &mut transform);
        assert_eq!(transform, Transform::default());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(Channel::parse("rotation").unwrap(), Channel::Rotation);
        assert!(Channel::parse("color").is_err());
        assert_eq!(Interpolation::parse("SLERP").unwrap(), Interpolation::Slerp);
        assert!(Interpolation::parse("CUBIC").is_err());
    }
}

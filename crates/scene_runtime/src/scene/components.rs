//! Scene components
//!
//! Plain data attached to entities through the scene's stores. Each s72-backed
//! component knows how to read itself from its JSON object; the builder decides
//! when to build one and when to alias an existing instance.

use crate::assets::IndexRange;
use crate::ecs::{Component, Entity, EntityId};
use crate::foundation::math::{utils, Mat4, Mat4Ext, Quaternion, Transform, Vec3};
use crate::json::{JsonError, Object, Value};

use super::bounds::Bounds;

/// Graph node: local transform plus first-child / next-sibling / parent links
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    /// Name of the NODE object this was built from
    pub name: String,
    /// Owning entity and its flags
    pub entity: Entity,
    /// Local transform relative to the parent
    pub transform: Transform,
    /// First child
    pub child: Option<EntityId>,
    /// Next node at the same level
    pub sibling: Option<EntityId>,
    /// Parent, for walking up to the root
    pub parent: Option<EntityId>,
}

impl SceneNode {
    /// Unlinked node with an identity transform
    pub fn new(name: impl Into<String>, entity: Entity) -> Self {
        Self {
            name: name.into(),
            entity,
            transform: Transform::default(),
            child: None,
            sibling: None,
            parent: None,
        }
    }

    /// Read `translation`, `rotation` (x, y, z, w) and `scale`; absent keys keep defaults
    pub fn read_transform(&mut self, obj: &Object) -> Result<(), JsonError> {
        if obj.contains_key("translation") {
            self.transform.translation = Vec3::from(obj.floats_n::<3>("translation")?);
        }
        if obj.contains_key("rotation") {
            let [x, y, z, w] = obj.floats_n::<4>("rotation")?;
            self.transform.rotation = utils::rotation_or_identity(Quaternion::new(w, x, y, z));
        }
        if obj.contains_key("scale") {
            self.transform.scale = Vec3::from(obj.floats_n::<3>("scale")?);
        }
        Ok(())
    }
}

/// Loaded mesh: where its indices live in the shared buffer and how big it is
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// Mesh-local bounding box
    pub bounds: Bounds,
    /// Index range in the shared index buffer
    pub range: IndexRange,
    /// Slot of the mesh's material in the material store
    pub material: Option<usize>,
    /// First of 8 bounds-corner vertices, when debug wireframes are on
    pub debug_vertex_offset: Option<u32>,
}

/// Perspective camera parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Width over height
    pub aspect: f32,
    /// Vertical field of view in radians
    pub vfov: f32,
    /// Near clip distance
    pub near: f32,
    /// Far clip distance
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            aspect: 1.777_77,
            vfov: 1.047_19,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera {
    /// Read the optional `perspective` block; missing fields keep defaults
    pub fn from_json(obj: &Object) -> Result<Self, JsonError> {
        let mut camera = Self::default();
        if let Some(perspective) = obj.get("perspective") {
            let perspective = perspective.as_object()?;
            camera.aspect = perspective.f32_or("aspect", camera.aspect)?;
            camera.vfov = perspective.f32_or("vfov", camera.vfov)?;
            camera.near = perspective.f32_or("near", camera.near)?;
            camera.far = perspective.f32_or("far", camera.far)?;
        }
        Ok(camera)
    }

    /// Projection matrix
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective(self.vfov, self.aspect, self.near, self.far)
    }

    /// Check the parameters describe a usable frustum
    pub fn validate(&self) -> Result<(), String> {
        if self.aspect <= 0.0 {
            return Err(format!("aspect must be positive, got {}", self.aspect));
        }
        if self.vfov <= 0.0 || self.vfov >= std::f32::consts::PI {
            return Err(format!("vfov must be in (0, pi), got {}", self.vfov));
        }
        if self.near <= 0.0 || self.far <= self.near {
            return Err(format!("need 0 < near < far, got near {} far {}", self.near, self.far));
        }
        Ok(())
    }
}

/// Constant value or texture reference
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialValue<T> {
    /// Uniform value
    Constant(T),
    /// Texture file name
    Texture(String),
}

impl MaterialValue<Vec3> {
    fn read(obj: &Object, key: &str, default: Vec3) -> Result<Self, JsonError> {
        match obj.get(key) {
            None => Ok(Self::Constant(default)),
            Some(Value::Object(texture)) => Ok(Self::Texture(texture.string("src")?.to_string())),
            Some(_) => Ok(Self::Constant(Vec3::from(obj.floats_n::<3>(key)?))),
        }
    }
}

impl MaterialValue<f32> {
    fn read(obj: &Object, key: &str, default: f32) -> Result<Self, JsonError> {
        match obj.get(key) {
            None => Ok(Self::Constant(default)),
            Some(Value::Object(texture)) => Ok(Self::Texture(texture.string("src")?.to_string())),
            Some(value) => Ok(Self::Constant(value.as_f32()?)),
        }
    }
}

/// Shading model of a material
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialKind {
    /// Vertex colors, no lighting model
    Simple,
    /// Diffuse only
    Lambertian {
        /// Base color
        albedo: MaterialValue<Vec3>,
    },
    /// Metallic-roughness
    Pbr {
        /// Base color
        albedo: MaterialValue<Vec3>,
        /// Roughness in `[0, 1]`
        roughness: MaterialValue<f32>,
        /// Metalness in `[0, 1]`
        metalness: MaterialValue<f32>,
    },
    /// Perfect reflector of the environment
    Mirror,
    /// Displays the environment in the normal direction
    Environment,
}

/// Surface description shared by meshes
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Shading model
    pub kind: MaterialKind,
    /// Tangent-space normal map
    pub normal_map: Option<String>,
    /// Height map
    pub displacement_map: Option<String>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            kind: MaterialKind::Simple,
            normal_map: None,
            displacement_map: None,
        }
    }
}

impl Material {
    /// Read a MATERIAL object
    pub fn from_json(obj: &Object) -> Result<Self, JsonError> {
        let white = Vec3::repeat(1.0);
        let kind = if let Some(pbr) = obj.get("pbr") {
            let pbr = pbr.as_object()?;
            MaterialKind::Pbr {
                albedo: MaterialValue::<Vec3>::read(pbr, "albedo", white)?,
                roughness: MaterialValue::<f32>::read(pbr, "roughness", 1.0)?,
                metalness: MaterialValue::<f32>::read(pbr, "metalness", 0.0)?,
            }
        } else if let Some(lambertian) = obj.get("lambertian") {
            MaterialKind::Lambertian {
                albedo: MaterialValue::<Vec3>::read(lambertian.as_object()?, "albedo", white)?,
            }
        } else if obj.contains_key("mirror") {
            MaterialKind::Mirror
        } else if obj.contains_key("environment") {
            MaterialKind::Environment
        } else {
            MaterialKind::Simple
        };

        let texture_src = |key: &str| -> Result<Option<String>, JsonError> {
            obj.get(key)
                .map(|v| v.as_object().and_then(|t| t.string("src")).map(str::to_string))
                .transpose()
        };

        Ok(Self {
            kind,
            normal_map: texture_src("normalMap")?,
            displacement_map: texture_src("displacementMap")?,
        })
    }
}

/// Emitter shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Directional light along the node's -Z
    Sun {
        /// Angular diameter in radians
        angle: f32,
        /// Irradiance in W/m^2
        strength: f32,
    },
    /// Spherical area light
    Sphere {
        /// Sphere radius
        radius: f32,
        /// Emitted power in W
        power: f32,
        /// Influence cutoff distance
        limit: Option<f32>,
    },
    /// Sphere light restricted to a cone along -Z
    Spot {
        /// Sphere radius
        radius: f32,
        /// Emitted power in W
        power: f32,
        /// Full cone angle in radians
        fov: f32,
        /// Fraction of the cone used for falloff
        blend: f32,
        /// Influence cutoff distance
        limit: Option<f32>,
    },
}

/// Light source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    /// Color multiplier
    pub tint: Vec3,
    /// Shadow map resolution, 0 for no shadows
    pub shadow: u32,
    /// Emitter shape
    pub kind: LightKind,
}

impl Light {
    /// Read a LIGHT object; exactly one of `sun`, `sphere` or `spot` is expected
    pub fn from_json(obj: &Object) -> Result<Self, JsonError> {
        let tint = if obj.contains_key("tint") {
            Vec3::from(obj.floats_n::<3>("tint")?)
        } else {
            Vec3::repeat(1.0)
        };
        let shadow = obj.get("shadow").map_or(Ok(0), |v| v.as_number()?.as_u32())?;
        let limit = |o: &Object| o.get("limit").map(Value::as_f32).transpose();

        let kind = if let Some(sun) = obj.get("sun") {
            let sun = sun.as_object()?;
            LightKind::Sun {
                angle: sun.f32("angle")?,
                strength: sun.f32("strength")?,
            }
        } else if let Some(sphere) = obj.get("sphere") {
            let sphere = sphere.as_object()?;
            LightKind::Sphere {
                radius: sphere.f32("radius")?,
                power: sphere.f32("power")?,
                limit: limit(sphere)?,
            }
        } else if let Some(spot) = obj.get("spot") {
            let spot = spot.as_object()?;
            LightKind::Spot {
                radius: spot.f32("radius")?,
                power: spot.f32("power")?,
                fov: spot.f32("fov")?,
                blend: spot.f32("blend")?,
                limit: limit(spot)?,
            }
        } else {
            return Err(JsonError::MissingKey("sun|sphere|spot".to_string()));
        };

        Ok(Self { tint, shadow, kind })
    }
}

/// Image-based lighting source
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    /// Radiance texture file
    pub radiance: String,
    /// Texture layout, usually `"cube"`
    pub layout: String,
    /// Pixel encoding, e.g. `"rgbe"`
    pub format: String,
}

impl Environment {
    /// Read an ENVIRONMENT object
    pub fn from_json(obj: &Object) -> Result<Self, JsonError> {
        let radiance = obj.object("radiance")?;
        let optional = |key: &str, default: &str| -> Result<String, JsonError> {
            radiance
                .get(key)
                .map_or(Ok(default), Value::as_string)
                .map(str::to_string)
        };
        Ok(Self {
            radiance: radiance.string("src")?.to_string(),
            layout: optional("type", "cube")?,
            format: optional("format", "linear")?,
        })
    }
}

impl Component for SceneNode {}
impl Component for Mesh {}
impl Component for Camera {}
impl Component for Material {}
impl Component for Light {}
impl Component for Environment {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationLevel;
    use crate::ecs::World;
    use crate::foundation::math::Quat;
    use crate::json::parse;
    use approx::assert_relative_eq;

    fn object(text: &str) -> Object {
        parse(text, ValidationLevel::Checked)
            .unwrap()
            .as_object()
            .unwrap()
            .clone()
    }

    #[test]
    fn test_node_transform_defaults_and_overrides() {
        let mut world = World::new();
        let mut node = SceneNode::new("n", world.create_entity());
        node.read_transform(&object(r#"{"translation": [1, 2, 3], "rotation": [0, 0, 1, 0]}"#))
            .unwrap();
        assert_eq!(node.transform.translation, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(node.transform.scale, Vec3::repeat(1.0));
        // (x, y, z, w) = (0, 0, 1, 0) is a half turn about Z
        let rotated = node.transform.rotation * Vec3::x();
        assert_relative_eq!(rotated, Vec3::new(-1.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_zero_rotation_reads_as_identity() {
        let mut world = World::new();
        let mut node = SceneNode::new("n", world.create_entity());
        node.read_transform(&object(r#"{"rotation": [0, 0, 0, 0]}"#)).unwrap();
        assert_eq!(node.transform.rotation, Quat::identity());
        assert!(node.transform.local_to_parent().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_camera_defaults_and_perspective() {
        let camera = Camera::from_json(&object(r#"{"perspective": {"aspect": 1.5, "near": 0.5}}"#))
            .unwrap();
        assert_relative_eq!(camera.aspect, 1.5);
        assert_relative_eq!(camera.near, 0.5);
        assert_relative_eq!(camera.vfov, Camera::default().vfov);
        assert!(camera.validate().is_ok());
    }

    #[test]
    fn test_camera_validate_rejects_inverted_clip() {
        let camera = Camera {
            near: 10.0,
            far: 1.0,
            ..Camera::default()
        };
        assert!(camera.validate().is_err());
    }

    #[test]
    fn test_material_kinds() {
        let pbr = Material::from_json(&object(
            r#"{"pbr": {"albedo": {"src": "wood.png"}, "roughness": 0.25}, "normalMap": {"src": "n.png"}}"#,
        ))
        .unwrap();
        assert_eq!(
            pbr.kind,
            MaterialKind::Pbr {
                albedo: MaterialValue::Texture("wood.png".into()),
                roughness: MaterialValue::Constant(0.25),
                metalness: MaterialValue::Constant(0.0),
            }
        );
        assert_eq!(pbr.normal_map.as_deref(), Some("n.png"));

        let simple = Material::from_json(&object(r#"{"simple": {}}"#)).unwrap();
        assert_eq!(simple.kind, MaterialKind::Simple);
        let mirror = Material::from_json(&object(r#"{"mirror": {}}"#)).unwrap();
        assert_eq!(mirror.kind, MaterialKind::Mirror);
    }

    #[test]
    fn test_light_kinds() {
        let spot = Light::from_json(&object(
            r#"{"tint": [1, 0.5, 0.5], "shadow": 256, "spot": {"radius": 0.1, "power": 50, "fov": 0.8, "blend": 0.2}}"#,
        ))
        .unwrap();
        assert_eq!(spot.shadow, 256);
        assert!(matches!(spot.kind, LightKind::Spot { limit: None, .. }));

        let missing = Light::from_json(&object(r#"{"tint": [1, 1, 1]}"#));
        assert!(missing.is_err());
    }

    #[test]
    fn test_environment_reads_radiance() {
        let env = Environment::from_json(&object(
            r#"{"radiance": {"src": "sky.png", "type": "cube", "format": "rgbe"}}"#,
        ))
        .unwrap();
        assert_eq!(env.radiance, "sky.png");
        assert_eq!(env.format, "rgbe");
    }
}

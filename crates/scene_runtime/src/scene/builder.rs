//! Two-pass s72 scene construction
//!
//! Pass one buckets every object of the top-level array by `(type, name)`; drivers go
//! to a separate list. Pass two walks the SCENE roots depth first, creating one entity
//! per NODE and building each referenced component the first time its name is seen.
//! Later references to the same name alias the stored instance. Drivers are attached
//! once the graph exists. The name tables live only for the duration of the build.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::assets::{GeometrySink, MeshError, MeshLoader, NotFound, SearchPaths};
use crate::config::ModeParameters;
use crate::ecs::{EntityFlags, EntityId, StoreError, World};
use crate::json::{JsonError, Object, Value};

use super::animation::{AnimationError, Channel, Driver};
use super::components::{Camera, Environment, Light, Material, SceneNode};
use super::scene::Scene;

/// Scene construction errors
#[derive(thiserror::Error, Debug)]
pub enum SceneError {
    /// Reading the scene file failed
    #[error("IO error reading {path}: {source}")]
    Io {
        /// Scene file
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Scene file not found on any search path
    #[error(transparent)]
    NotFound(#[from] NotFound),

    /// Malformed document or object
    #[error("JSON error: {0}")]
    Json(#[from] JsonError),

    /// Mesh stream could not be loaded
    #[error("mesh error: {0}")]
    Mesh(#[from] MeshError),

    /// Component store lookup failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Driver object could not be read
    #[error("animation error: {0}")]
    Animation(#[from] AnimationError),

    /// Object `type` outside the known set
    #[error("unknown object type \"{0}\"")]
    UnknownType(String),

    /// A name was referenced but never defined
    #[error("undefined {kind} \"{name}\"")]
    UndefinedReference {
        /// Expected object type
        kind: &'static str,
        /// Referenced name
        name: String,
    },

    /// No SCENE object in the file
    #[error("file has no SCENE object")]
    MissingScene,

    /// More than one SCENE object
    #[error("second SCENE object \"{0}\"")]
    DuplicateScene(String),

    /// First array element is not a version string
    #[error("invalid version header: {0}")]
    InvalidVersion(String),

    /// A node lists one of its own ancestors, or a sibling chain would loop
    #[error("node \"{0}\" would make the hierarchy cyclic")]
    CyclicHierarchy(String),

    /// A shared node was given two different next siblings
    #[error("node \"{node}\" already has sibling {existing}, cannot link {requested}")]
    SiblingConflict {
        /// Node being linked
        node: String,
        /// Current next sibling
        existing: EntityId,
        /// Sibling that was requested
        requested: EntityId,
    },

    /// Driver keyframes are inconsistent
    #[error("invalid driver \"{name}\": {reason}")]
    InvalidDriver {
        /// Driver name
        name: String,
        /// What is wrong
        reason: String,
    },

    /// Two drivers write the same channel of the same node
    #[error("node \"{node}\" has more than one {channel:?} driver")]
    DuplicateDriver {
        /// Target node
        node: String,
        /// Channel written twice
        channel: Channel,
    },

    /// Requested start camera does not exist
    #[error("camera \"{0}\" not found")]
    CameraNotFound(String),

    /// Component parameters are unusable
    #[error("invalid {kind} \"{name}\": {reason}")]
    InvalidComponent {
        /// Object type
        kind: &'static str,
        /// Object name
        name: String,
        /// What is wrong
        reason: String,
    },
}

/// s72 object types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    /// Root list of the graph
    Scene,
    /// Graph node
    Node,
    /// Geometry
    Mesh,
    /// Camera parameters
    Camera,
    /// Keyframe animation
    Driver,
    /// Surface description
    Material,
    /// Environment lighting
    Environment,
    /// Light source
    Light,
    /// Opaque payload, ignored
    Data,
}

impl ObjectType {
    /// Parse a `type` field
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "SCENE" => Self::Scene,
            "NODE" => Self::Node,
            "MESH" => Self::Mesh,
            "CAMERA" => Self::Camera,
            "DRIVER" => Self::Driver,
            "MATERIAL" => Self::Material,
            "ENVIRONMENT" => Self::Environment,
            "LIGHT" => Self::Light,
            "DATA" => Self::Data,
            _ => return None,
        })
    }

    /// Name as written in s72
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scene => "SCENE",
            Self::Node => "NODE",
            Self::Mesh => "MESH",
            Self::Camera => "CAMERA",
            Self::Driver => "DRIVER",
            Self::Material => "MATERIAL",
            Self::Environment => "ENVIRONMENT",
            Self::Light => "LIGHT",
            Self::Data => "DATA",
        }
    }
}

struct TempObject<'d> {
    object: &'d Object,
    references: u32,
}

type Key<'d> = (ObjectType, &'d str);

/// Builds a [`Scene`] from a parsed s72 document
pub struct SceneBuilder<'d, 'e> {
    params: &'e ModeParameters,
    world: &'e mut World,
    sink: &'e mut dyn GeometrySink,
    loader: MeshLoader<'e>,
    objects: HashMap<Key<'d>, TempObject<'d>>,
    drivers: Vec<&'d Object>,
    scene_object: Option<&'d Object>,
    /// Slot of each built component; for NODE, the entity id
    built: HashMap<Key<'d>, usize>,
    ancestors: Vec<&'d str>,
    first_camera: Option<EntityId>,
    start_camera: Option<EntityId>,
    scene: Scene,
}

impl<'d, 'e> SceneBuilder<'d, 'e> {
    /// Build the scene described by `document`, appending geometry to `sink` and
    /// resolving binary streams through `paths`.
    pub fn build(
        document: &'d Value,
        params: &'e ModeParameters,
        world: &'e mut World,
        sink: &'e mut dyn GeometrySink,
        paths: &'e SearchPaths,
    ) -> Result<Scene, SceneError> {
        let loader = MeshLoader::new(paths, params.validation).with_debug_bounds(params.debug_bounds);
        let mut builder = Self {
            params,
            world,
            sink,
            loader,
            objects: HashMap::new(),
            drivers: Vec::new(),
            scene_object: None,
            built: HashMap::new(),
            ancestors: Vec::new(),
            first_camera: None,
            start_camera: None,
            scene: Scene::new(params),
        };

        builder.classify(document)?;
        builder.instantiate_roots()?;
        builder.attach_drivers()?;
        builder.select_camera()?;
        builder.report_unused();

        let scene = builder.scene;
        log::info!(
            "Built scene (version {}): {} nodes, {} meshes, {} cameras, {} lights, {} drivers",
            scene.file_version,
            scene.graph.len(),
            scene.meshes.len(),
            scene.cameras.len(),
            scene.lights.len(),
            scene.drivers.len()
        );
        Ok(scene)
    }

    fn checked(&self) -> bool {
        self.params.validation.is_checked()
    }

    /// Pass one: bucket objects by type and name
    fn classify(&mut self, document: &'d Value) -> Result<(), SceneError> {
        let items = document.as_array()?;
        let Some((header, objects)) = items.split_first() else {
            return Err(SceneError::InvalidVersion("empty scene array".to_string()));
        };

        match header.as_string() {
            Ok(version) => self.scene.file_version = version.to_string(),
            Err(e) if self.checked() => return Err(SceneError::InvalidVersion(e.to_string())),
            Err(_) => log::warn!("Scene file has no version header"),
        }

        for item in objects {
            let object = item.as_object()?;
            let type_name = object.string("type")?;
            let name = object.string("name")?;
            let kind = ObjectType::parse(type_name)
                .ok_or_else(|| SceneError::UnknownType(type_name.to_string()))?;

            match kind {
                ObjectType::Scene => {
                    if let Some(previous) = self.scene_object {
                        if self.checked() {
                            return Err(SceneError::DuplicateScene(name.to_string()));
                        }
                        log::warn!(
                            "Replacing SCENE \"{}\" with \"{name}\"",
                            previous.string("name").unwrap_or_default()
                        );
                    }
                    self.scene_object = Some(object);
                }
                ObjectType::Driver => self.drivers.push(object),
                ObjectType::Data => log::debug!("Ignoring DATA object \"{name}\""),
                _ => {
                    if self.objects.contains_key(&(kind, name)) {
                        log::warn!("Duplicate {} \"{name}\"; keeping the first", kind.as_str());
                        continue;
                    }
                    self.objects.insert(
                        (kind, name),
                        TempObject {
                            object,
                            references: 0,
                        },
                    );
                }
            }
        }
        log::debug!(
            "Classified {} objects and {} drivers",
            self.objects.len(),
            self.drivers.len()
        );
        Ok(())
    }

    /// Look up a pass-one object and count the reference
    fn lookup(&mut self, kind: ObjectType, name: &'d str) -> Result<&'d Object, SceneError> {
        let entry = self
            .objects
            .get_mut(&(kind, name))
            .ok_or_else(|| SceneError::UndefinedReference {
                kind: kind.as_str(),
                name: name.to_string(),
            })?;
        entry.references += 1;
        Ok(entry.object)
    }

    /// Pass two entry: instantiate each root and chain them as siblings
    fn instantiate_roots(&mut self) -> Result<(), SceneError> {
        let scene_object = self.scene_object.ok_or(SceneError::MissingScene)?;
        if !scene_object.contains_key("roots") {
            log::warn!("SCENE has no roots");
            return Ok(());
        }

        let mut previous = None;
        for name in scene_object.strings("roots")? {
            let id = self.instantiate_node(name)?;
            match previous {
                None => self.scene.root = Some(id),
                Some(prev) => self.link_sibling(prev, id)?,
            }
            previous = Some(id);
        }
        Ok(())
    }

    /// Create the entity for NODE `name`, or return the existing one
    fn instantiate_node(&mut self, name: &'d str) -> Result<EntityId, SceneError> {
        if let Some(&id) = self.built.get(&(ObjectType::Node, name)) {
            log::debug!("Aliasing node \"{name}\" to entity {id}");
            return Ok(id as EntityId);
        }
        let object = self.lookup(ObjectType::Node, name)?;

        let entity = self.world.create_entity();
        let id = entity.id();
        let mut node = SceneNode::new(name, entity);
        node.read_transform(object)?;
        node.parent = self.ancestors.last().and_then(|parent| self.node_id(parent));

        self.attach_components(object, &mut node)?;
        log::debug!("Node \"{name}\" -> entity {id} ({:?})", node.entity.flags());

        self.scene.graph.insert(id, node);
        self.built.insert((ObjectType::Node, name), id as usize);

        if object.contains_key("children") {
            let children = object.strings("children")?;
            self.ancestors.push(name);
            let result = self.instantiate_children(id, children);
            self.ancestors.pop();
            result?;
        }
        Ok(id)
    }

    fn instantiate_children(&mut self, parent: EntityId, names: Vec<&'d str>) -> Result<(), SceneError> {
        let mut previous = None;
        for name in names {
            if self.ancestors.contains(&name) {
                return Err(SceneError::CyclicHierarchy(name.to_string()));
            }
            let id = self.instantiate_node(name)?;
            match previous {
                None => {
                    if self.reaches(id, parent)? {
                        return Err(SceneError::CyclicHierarchy(name.to_string()));
                    }
                    self.scene.graph.get_mut(parent)?.child = Some(id);
                }
                Some(prev) => self.link_sibling(prev, id)?,
            }
            previous = Some(id);
        }
        Ok(())
    }

    /// Whether `target` can be reached from `from` through child or sibling links
    fn reaches(&self, from: EntityId, target: EntityId) -> Result<bool, SceneError> {
        let graph = &self.scene.graph;
        let mut visited = HashSet::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == target {
                return Ok(true);
            }
            if !visited.insert(id) {
                continue;
            }
            let node = graph.get(id)?;
            stack.extend(node.child);
            stack.extend(node.sibling);
        }
        Ok(false)
    }

    fn node_id(&self, name: &str) -> Option<EntityId> {
        self.built
            .get(&(ObjectType::Node, name))
            .map(|&id| id as EntityId)
    }

    /// Set `prev.sibling = next`. Shared nodes keep their first link.
    fn link_sibling(&mut self, prev: EntityId, next: EntityId) -> Result<(), SceneError> {
        let checked = self.checked();
        if self.reaches(next, prev)? {
            let name = self.scene.graph.get(next)?.name.clone();
            return Err(SceneError::CyclicHierarchy(name));
        }

        let node = self.scene.graph.get_mut(prev)?;
        match node.sibling {
            None => node.sibling = Some(next),
            Some(existing) if existing == next => {}
            Some(existing) if checked => {
                return Err(SceneError::SiblingConflict {
                    node: node.name.clone(),
                    existing,
                    requested: next,
                });
            }
            Some(existing) => log::warn!(
                "Node \"{}\" already followed by {existing}; ignoring link to {next}",
                node.name
            ),
        }
        Ok(())
    }

    fn attach_components(&mut self, object: &'d Object, node: &mut SceneNode) -> Result<(), SceneError> {
        let id = node.entity.id();

        if let Some(mesh) = reference(object, "mesh")? {
            self.attach_mesh(id, mesh)?;
            let mesh_material = self
                .objects
                .get(&(ObjectType::Mesh, mesh))
                .map(|t| t.object)
                .map(|o| reference(o, "material"))
                .transpose()?
                .flatten();
            if let Some(material) = reference(object, "material")?.or(mesh_material) {
                self.attach_material(id, material)?;
            }
            node.entity.set(EntityFlags::HAS_MESH, true);
        } else if reference(object, "material")?.is_some() {
            log::debug!("Node \"{}\" has a material but no mesh", node.name);
        }

        if let Some(camera) = reference(object, "camera")? {
            self.attach_camera(id, camera)?;
            node.entity.set(EntityFlags::HAS_CAMERA, true);
        }

        if let Some(light) = reference(object, "light")? {
            if let Some(slot) = self.built_slot(ObjectType::Light, light) {
                self.scene.lights.insert_existing(id, slot)?;
            } else {
                let light_object = self.lookup(ObjectType::Light, light)?;
                let slot = self.scene.lights.insert(id, Light::from_json(light_object)?);
                self.built.insert((ObjectType::Light, light), slot);
            }
            node.entity.set(EntityFlags::HAS_LIGHT, true);
        }

        if let Some(environment) = reference(object, "environment")? {
            if let Some(slot) = self.built_slot(ObjectType::Environment, environment) {
                self.scene.environments.insert_existing(id, slot)?;
            } else {
                let env_object = self.lookup(ObjectType::Environment, environment)?;
                let slot = self
                    .scene
                    .environments
                    .insert(id, Environment::from_json(env_object)?);
                self.built.insert((ObjectType::Environment, environment), slot);
            }
            node.entity.set(EntityFlags::HAS_ENVIRONMENT, true);
        }
        Ok(())
    }

    fn built_slot(&self, kind: ObjectType, name: &str) -> Option<usize> {
        let slot = self.built.get(&(kind, name)).copied();
        if let Some(slot) = slot {
            log::debug!("Aliasing {} \"{name}\" (slot {slot})", kind.as_str());
        }
        slot
    }

    fn attach_mesh(&mut self, id: EntityId, name: &'d str) -> Result<(), SceneError> {
        if let Some(slot) = self.built_slot(ObjectType::Mesh, name) {
            self.scene.meshes.insert_existing(id, slot)?;
            return Ok(());
        }
        let object = self.lookup(ObjectType::Mesh, name)?;
        let mut mesh = self.loader.load(object, &mut *self.sink)?;
        if let Some(material) = reference(object, "material")? {
            mesh.material = Some(self.material_slot(id, material)?);
        }
        let slot = self.scene.meshes.insert(id, mesh);
        self.built.insert((ObjectType::Mesh, name), slot);
        Ok(())
    }

    /// Slot of MATERIAL `name`, building it (mapped to `id`) if needed
    fn material_slot(&mut self, id: EntityId, name: &'d str) -> Result<usize, SceneError> {
        if let Some(slot) = self.built.get(&(ObjectType::Material, name)) {
            return Ok(*slot);
        }
        let object = self.lookup(ObjectType::Material, name)?;
        let slot = self.scene.materials.insert(id, Material::from_json(object)?);
        self.built.insert((ObjectType::Material, name), slot);
        log::debug!("Material \"{name}\" -> slot {slot}");
        Ok(slot)
    }

    fn attach_material(&mut self, id: EntityId, name: &'d str) -> Result<(), SceneError> {
        let slot = self.material_slot(id, name)?;
        self.scene.materials.insert_existing(id, slot)?;
        Ok(())
    }

    fn attach_camera(&mut self, id: EntityId, name: &'d str) -> Result<(), SceneError> {
        if let Some(slot) = self.built_slot(ObjectType::Camera, name) {
            self.scene.cameras.insert_existing(id, slot)?;
            return Ok(());
        }
        let object = self.lookup(ObjectType::Camera, name)?;
        let camera = Camera::from_json(object)?;
        if self.checked() {
            camera.validate().map_err(|reason| SceneError::InvalidComponent {
                kind: "CAMERA",
                name: name.to_string(),
                reason,
            })?;
        }
        let slot = self.scene.cameras.insert(id, camera);
        self.built.insert((ObjectType::Camera, name), slot);

        if self.first_camera.is_none() {
            self.first_camera = Some(id);
        }
        if self.start_camera.is_none()
            && (self.params.wants_default_camera() || self.params.start_camera == name)
        {
            log::debug!("Camera \"{name}\" on entity {id} is the start camera");
            self.start_camera = Some(id);
        }
        Ok(())
    }

    /// Bind each DRIVER to its target node
    fn attach_drivers(&mut self) -> Result<(), SceneError> {
        let checked = self.checked();
        let mut targets: HashSet<(EntityId, Channel)> = HashSet::new();

        for &object in &self.drivers {
            let node_name = object.string("node")?;
            let Some(id) = self.node_id(node_name) else {
                if checked {
                    return Err(SceneError::UndefinedReference {
                        kind: "NODE",
                        name: node_name.to_string(),
                    });
                }
                log::warn!("Driver targets unknown node \"{node_name}\"; skipped");
                continue;
            };

            let driver = Driver::from_json(object, id)?;
            if let Err(reason) = driver.validate() {
                if checked {
                    return Err(SceneError::InvalidDriver {
                        name: driver.name,
                        reason,
                    });
                }
                log::warn!("Skipping driver \"{}\": {reason}", driver.name);
                continue;
            }
            if !targets.insert((id, driver.channel)) {
                if checked {
                    return Err(SceneError::DuplicateDriver {
                        node: node_name.to_string(),
                        channel: driver.channel,
                    });
                }
                log::warn!(
                    "Node \"{node_name}\" has several {:?} drivers; the last one wins",
                    driver.channel
                );
            }

            self.scene.graph.get_mut(id)?.entity.mark_driver_animated();
            log::debug!(
                "Driver \"{}\" animates {:?} of \"{node_name}\" ({} keys)",
                driver.name,
                driver.channel,
                driver.times.len()
            );
            self.scene.drivers.insert(id, driver);
        }
        Ok(())
    }

    fn select_camera(&mut self) -> Result<(), SceneError> {
        let camera = match self.start_camera {
            Some(id) => Some(id),
            None if self.params.wants_default_camera() => None,
            None if self.checked() => {
                return Err(SceneError::CameraNotFound(self.params.start_camera.clone()));
            }
            None => {
                log::warn!(
                    "Camera \"{}\" not found; using the first camera",
                    self.params.start_camera
                );
                self.first_camera
            }
        };
        self.scene.render_camera = camera;
        self.scene.cull_camera = camera;
        Ok(())
    }

    fn report_unused(&self) {
        for ((kind, name), temp) in &self.objects {
            if temp.references == 0 {
                log::debug!("{} \"{name}\" is never referenced", kind.as_str());
            }
        }
    }
}

/// Optional string reference `key` of an object
fn reference<'d>(object: &'d Object, key: &str) -> Result<Option<&'d str>, JsonError> {
    object.get(key).map(Value::as_string).transpose()
}

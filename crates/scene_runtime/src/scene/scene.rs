//! Runtime scene
//!
//! Owns every component store built from an s72 file and runs the per-frame work:
//! driver evaluation, orbit camera updates and the culled draw list handed to the
//! renderer.

use std::fmt;

use crate::assets::{GeometrySink, IndexRange, SearchPaths};
use crate::config::ModeParameters;
use crate::ecs::{ComponentStore, EntityFlags, EntityId, StoreError, World};
use crate::foundation::math::{Mat4, Transform};
use crate::json;

use super::animation::Driver;
use super::bounds::{frustum_cull, Bounds, Frustum};
use super::builder::{SceneBuilder, SceneError};
use super::components::{Camera, Environment, Light, Material, Mesh, SceneNode};
use super::orbit::{OrbitControl, OrbitInput};

/// One mesh to draw this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCommand {
    /// Entity the mesh is attached to
    pub entity: EntityId,
    /// Model-to-world matrix
    pub world: Mat4,
    /// Index range in the shared index buffer
    pub range: IndexRange,
    /// World-space box enclosing the mesh
    pub bounds: Bounds,
}

/// Everything the renderer needs for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameDraws {
    /// Visible meshes in depth-first graph order
    pub draws: Vec<DrawCommand>,
    /// Meshes rejected by the frustum test
    pub culled: usize,
    /// World-to-view matrix of the render camera
    pub view: Mat4,
    /// Projection of the render camera
    pub projection: Mat4,
}

/// Scene graph plus component stores
#[derive(Debug, Clone)]
pub struct Scene {
    /// Graph nodes, one per instantiated NODE
    pub graph: ComponentStore<SceneNode>,
    /// Meshes; nodes naming the same MESH share a slot
    pub meshes: ComponentStore<Mesh>,
    /// Materials, shared the same way
    pub materials: ComponentStore<Material>,
    /// Scene cameras plus the user orbit camera
    pub cameras: ComponentStore<Camera>,
    /// Lights
    pub lights: ComponentStore<Light>,
    /// Environments
    pub environments: ComponentStore<Environment>,
    /// Keyframe drivers in file order, keyed by the entity they animate
    pub drivers: ComponentStore<Driver>,
    /// Orbit state of user cameras
    pub orbit_controls: ComponentStore<OrbitControl>,
    pub(super) root: Option<EntityId>,
    pub(super) render_camera: Option<EntityId>,
    pub(super) cull_camera: Option<EntityId>,
    pub(super) file_version: String,
    pub(super) frustum_culling: bool,
    pub(super) debug_camera: bool,
}

impl Scene {
    /// Empty scene configured from `params`
    pub fn new(params: &ModeParameters) -> Self {
        Self {
            graph: ComponentStore::new(),
            meshes: ComponentStore::new(),
            materials: ComponentStore::new(),
            cameras: ComponentStore::new(),
            lights: ComponentStore::new(),
            environments: ComponentStore::new(),
            drivers: ComponentStore::new(),
            orbit_controls: ComponentStore::new(),
            root: None,
            render_camera: None,
            cull_camera: None,
            file_version: String::new(),
            frustum_culling: params.frustum_culling,
            debug_camera: params.debug_camera,
        }
    }

    /// Find, parse and build the scene named by `params.scene_name`.
    ///
    /// The scene file is looked up as given, with `.s72` appended, and then under each
    /// search directory. Binary streams are looked up next to the scene file first.
    pub fn load(
        params: &ModeParameters,
        world: &mut World,
        sink: &mut dyn GeometrySink,
    ) -> Result<Self, SceneError> {
        let paths = SearchPaths::new(params.search_dirs.clone());
        let path = paths.resolve(&params.scene_name, Some("s72"))?;
        log::info!("Loading scene {}", path.display());

        let text = std::fs::read_to_string(&path).map_err(|source| SceneError::Io {
            path: path.clone(),
            source,
        })?;
        let document = json::parse(&text, params.validation)?;

        let streams = match path.parent() {
            Some(dir) => paths.with_base(dir),
            None => paths,
        };
        SceneBuilder::build(&document, params, world, sink, &streams)
    }

    /// First root node
    pub const fn root(&self) -> Option<EntityId> {
        self.root
    }

    /// Version string from the file header
    pub fn file_version(&self) -> &str {
        &self.file_version
    }

    /// Camera the frame is rendered from
    pub const fn render_camera(&self) -> Option<EntityId> {
        self.render_camera
    }

    /// Camera whose frustum culls meshes
    pub const fn cull_camera(&self) -> Option<EntityId> {
        self.cull_camera
    }

    /// Render from `id`, which must carry a camera
    pub fn set_render_camera(&mut self, id: EntityId) -> Result<(), StoreError> {
        self.cameras.get(id)?;
        self.render_camera = Some(id);
        Ok(())
    }

    /// Cull against `id`'s frustum, which must carry a camera
    pub fn set_cull_camera(&mut self, id: EntityId) -> Result<(), StoreError> {
        self.cameras.get(id)?;
        self.cull_camera = Some(id);
        Ok(())
    }

    /// Turn frustum culling on or off
    pub fn set_frustum_culling(&mut self, enabled: bool) {
        self.frustum_culling = enabled;
    }

    /// Enable or disable a node. Disabled nodes are not animated, and neither they
    /// nor their children are drawn.
    pub fn set_enabled(&mut self, id: EntityId, enabled: bool) -> Result<(), StoreError> {
        self.graph.get_mut(id)?.entity.set(EntityFlags::ENABLED, enabled);
        Ok(())
    }

    /// First entity built from the NODE called `name`
    pub fn find_node(&self, name: &str) -> Option<EntityId> {
        self.graph
            .iter()
            .filter(|(_, node)| node.name == name)
            .map(|(id, _)| id)
            .min()
    }

    /// Evaluate every driver at `elapsed` seconds and write the results into the
    /// animated transforms
    pub fn update_drivers(&mut self, elapsed: f32) {
        for driver in self.drivers.values() {
            let Ok(node) = self.graph.get_mut(driver.entity_id) else {
                log::trace!("Driver {} targets unmapped entity {}", driver.name, driver.entity_id);
                continue;
            };
            if node.entity.is_enabled() {
                driver.apply(elapsed, &mut node.transform);
            }
        }
    }

    /// Model-to-world matrix of `id`, following parent links
    pub fn world_matrix(&self, id: EntityId) -> Result<Mat4, StoreError> {
        let mut node = self.graph.get(id)?;
        let mut matrix = node.transform.local_to_parent();
        while let Some(parent) = node.parent {
            node = self.graph.get(parent)?;
            matrix = node.transform.local_to_parent() * matrix;
        }
        Ok(matrix)
    }

    /// World-to-local matrix of `id`; the view matrix when `id` is a camera
    pub fn world_to_local(&self, id: EntityId) -> Result<Mat4, StoreError> {
        let mut node = self.graph.get(id)?;
        let mut matrix = node.transform.parent_to_local();
        while let Some(parent) = node.parent {
            node = self.graph.get(parent)?;
            matrix *= node.transform.parent_to_local();
        }
        Ok(matrix)
    }

    /// View and projection matrices of camera `id`
    pub fn camera_matrices(&self, id: EntityId) -> Result<(Mat4, Mat4), StoreError> {
        let projection = self.cameras.get(id)?.projection();
        Ok((self.world_to_local(id)?, projection))
    }

    /// Collect the meshes to draw this frame with their world matrices, plus the
    /// render camera's view and projection. Without a render camera the view is the
    /// identity and the projection uses default camera parameters.
    pub fn draw_scene(&self) -> Result<FrameDraws, StoreError> {
        let (view, projection) = match self.render_camera {
            Some(id) => self.camera_matrices(id)?,
            None => (Mat4::identity(), Camera::default().projection()),
        };

        let frustum = match self.cull_camera.filter(|_| self.frustum_culling) {
            Some(id) => {
                let (cull_view, cull_projection) = self.camera_matrices(id)?;
                Some(Frustum::from_camera(&cull_projection, &cull_view))
            }
            None => None,
        };

        let mut frame = FrameDraws {
            draws: Vec::new(),
            culled: 0,
            view,
            projection,
        };

        let limit = self.graph.mapped_count();
        let mut stack: Vec<(EntityId, Mat4, usize)> =
            self.root.map(|id| (id, Mat4::identity(), 0)).into_iter().collect();
        while let Some((id, parent_world, steps)) = stack.pop() {
            if steps >= limit {
                log::warn!("Link path through entity {id} is longer than the graph; skipping loop");
                continue;
            }
            let node = self.graph.get(id)?;
            if let Some(sibling) = node.sibling {
                stack.push((sibling, parent_world, steps + 1));
            }
            if !node.entity.is_enabled() {
                continue;
            }

            let world = parent_world * node.transform.local_to_parent();
            if self.meshes.contains(id) {
                let mesh = self.meshes.get(id)?;
                let visible = frustum
                    .as_ref()
                    .map_or(true, |f| frustum_cull(f, &mesh.bounds, &world));
                if visible {
                    frame.draws.push(DrawCommand {
                        entity: id,
                        world,
                        range: mesh.range,
                        bounds: mesh.bounds.transformed(&world),
                    });
                } else {
                    frame.culled += 1;
                }
            }
            if let Some(child) = node.child {
                stack.push((child, world, steps + 1));
            }
        }

        log::trace!("Frame: {} draws, {} culled", frame.draws.len(), frame.culled);
        Ok(frame)
    }

    /// Add a user-controlled orbit camera outside the hierarchy and render from it.
    ///
    /// It also becomes the cull camera, unless `debug_camera` is set and a scene
    /// camera is already culling; then culling stays on the scene camera.
    pub fn add_orbit_camera(&mut self, world: &mut World) -> EntityId {
        let mut entity = world.create_entity();
        entity.set(EntityFlags::HAS_CAMERA | EntityFlags::HAS_ORBIT_CONTROL, true);
        entity.set(EntityFlags::STATIC, false);
        let id = entity.id();

        let orbit = OrbitControl::default();
        let (rotation, position) = orbit.to_orientation_position();
        let mut node = SceneNode::new("orbit_camera", entity);
        node.transform = Transform::from_orientation_position(rotation, position);

        self.graph.insert(id, node);
        self.cameras.insert(id, Camera::default());
        self.orbit_controls.insert(id, orbit);

        self.render_camera = Some(id);
        if !(self.debug_camera && self.cull_camera.is_some()) {
            self.cull_camera = Some(id);
        }
        log::debug!("Added orbit camera {id}");
        id
    }

    /// Apply one frame of input to orbit camera `id` and refresh its transform
    pub fn update_orbit_camera(&mut self, id: EntityId, input: &OrbitInput) -> Result<(), StoreError> {
        let orbit = self.orbit_controls.get_mut(id)?;
        orbit.update(input);
        let (rotation, position) = orbit.to_orientation_position();
        self.graph.get_mut(id)?.transform = Transform::from_orientation_position(rotation, position);
        Ok(())
    }

    /// Indented tree of the graph, one node per line, `--` per depth level
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let limit = self.graph.mapped_count();
        let mut stack: Vec<(EntityId, usize, usize)> = self.root.map(|id| (id, 0, 0)).into_iter().collect();
        while let Some((id, depth, steps)) = stack.pop() {
            if steps >= limit {
                continue;
            }
            let Ok(node) = self.graph.get(id) else {
                continue;
            };
            out.push_str(&"--".repeat(depth));
            out.push_str(&format!("{} [{}]", node.name, id));
            self.describe_components(id, &mut out);
            out.push('\n');

            if let Some(sibling) = node.sibling {
                stack.push((sibling, depth, steps + 1));
            }
            if let Some(child) = node.child {
                stack.push((child, depth + 1, steps + 1));
            }
        }
        out
    }

    fn describe_components(&self, id: EntityId, out: &mut String) {
        if let Ok(mesh) = self.meshes.get(id) {
            out.push_str(&format!(
                " Mesh(indices: {}, offset: {})",
                mesh.range.count, mesh.range.offset
            ));
        }
        if let Ok(camera) = self.cameras.get(id) {
            out.push_str(&format!(
                " Camera(aspect: {}, vfov: {}, near: {}, far: {})",
                camera.aspect, camera.vfov, camera.near, camera.far
            ));
        }
        if self.lights.contains(id) {
            out.push_str(" Light");
        }
        if self.environments.contains(id) {
            out.push_str(" Environment");
        }
        if self.drivers.contains(id) {
            out.push_str(" Driven");
        }
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

//! s72 mesh loader
//!
//! A MESH object names a vertex `count`, a set of attribute streams and optionally an
//! index stream, all stored in external binary files:
//!
//! ```json
//! { "type": "MESH", "name": "cube", "topology": "TRIANGLE_LIST", "count": 36,
//!   "attributes": {
//!     "POSITION": { "src": "cube.b72", "offset": 0,  "stride": 28, "format": "R32G32B32_SFLOAT" },
//!     "NORMAL":   { "src": "cube.b72", "offset": 12, "stride": 28, "format": "R32G32B32_SFLOAT" },
//!     "COLOR":    { "src": "cube.b72", "offset": 24, "stride": 28, "format": "R8G8B8A8_UNORM" } },
//!   "indices": { "src": "cube.idx", "offset": 0, "format": "UINT32" } }
//! ```
//!
//! Vertices are decoded into [`Vertex`] records and appended to a [`GeometrySink`].
//! With an index stream the indices are re-based onto the sink's current vertex count;
//! without one, duplicate vertices are merged and an index list is generated.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::config::ValidationLevel;
use crate::json::{JsonError, Object};
use crate::scene::bounds::Bounds;
use crate::scene::components::Mesh;

use super::resolve::{NotFound, SearchPaths};
use super::vertex::{GeometrySink, Vertex};

/// Mesh loading errors
#[derive(thiserror::Error, Debug)]
pub enum MeshError {
    /// Reading a stream failed
    #[error("IO error reading {path}: {source}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Stream file not found
    #[error(transparent)]
    NotFound(#[from] NotFound),

    /// Mesh object had the wrong shape
    #[error("JSON error: {0}")]
    Json(#[from] JsonError),

    /// Attribute format outside the supported table
    #[error("unsupported attribute format: {0}")]
    UnknownFormat(String),

    /// Index format other than UINT8/UINT16/UINT32
    #[error("unsupported index format: {0}")]
    UnknownIndexFormat(String),

    /// Attribute name outside POSITION/NORMAL/TANGENT/TEXCOORD/COLOR
    #[error("unknown vertex attribute: {0}")]
    UnknownAttribute(String),

    /// Every mesh needs positions
    #[error("mesh has no POSITION attribute")]
    MissingPosition,

    /// Stream shorter than the attribute layout requires
    #[error("{src} holds {len} bytes but {needed} are required")]
    Truncated {
        /// Stream file name
        src: String,
        /// Bytes required
        needed: usize,
        /// Bytes available
        len: usize,
    },

    /// An index points past the mesh's vertices
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfBounds {
        /// Offending index
        index: u32,
        /// Vertices in the mesh
        vertex_count: u32,
    },

    /// Re-based indices would not fit in 32 bits
    #[error("{vertex_count} vertices past sink offset {first_vertex} overflow 32-bit indices")]
    IndexOverflow {
        /// Vertices already in the sink
        first_vertex: u32,
        /// Vertices in the mesh
        vertex_count: usize,
    },
}

/// Which vertex field an attribute stream fills
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeName {
    /// Position (required)
    Position,
    /// Normal
    Normal,
    /// Tangent
    Tangent,
    /// Texture coordinate
    TexCoord,
    /// Vertex color
    Color,
}

impl AttributeName {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "POSITION" => Some(Self::Position),
            "NORMAL" => Some(Self::Normal),
            "TANGENT" => Some(Self::Tangent),
            "TEXCOORD" => Some(Self::TexCoord),
            "COLOR" => Some(Self::Color),
            _ => None,
        }
    }
}

/// Element encoding of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeFormat {
    /// 3 x f32
    R32G32B32Sfloat,
    /// 4 x f32
    R32G32B32A32Sfloat,
    /// 2 x f32
    R32G32Sfloat,
    /// 1 x f32
    R32Sfloat,
    /// 4 x u8, normalized
    R8G8B8A8Unorm,
}

impl AttributeFormat {
    /// Parse a format name
    pub fn parse(name: &str) -> Result<Self, MeshError> {
        match name {
            "R32G32B32_SFLOAT" => Ok(Self::R32G32B32Sfloat),
            "R32G32B32A32_SFLOAT" => Ok(Self::R32G32B32A32Sfloat),
            "R32G32_SFLOAT" => Ok(Self::R32G32Sfloat),
            "R32_SFLOAT" => Ok(Self::R32Sfloat),
            "R8G8B8A8_UNORM" => Ok(Self::R8G8B8A8Unorm),
            other => Err(MeshError::UnknownFormat(other.to_string())),
        }
    }

    /// Bytes per element
    pub const fn size(self) -> usize {
        match self {
            Self::R32G32B32Sfloat => 12,
            Self::R32G32B32A32Sfloat => 16,
            Self::R32G32Sfloat => 8,
            Self::R32Sfloat | Self::R8G8B8A8Unorm => 4,
        }
    }
}

/// Index element width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    /// 8-bit indices
    Uint8,
    /// 16-bit indices
    Uint16,
    /// 32-bit indices
    Uint32,
}

impl IndexFormat {
    /// Parse an index format name
    pub fn parse(name: &str) -> Result<Self, MeshError> {
        match name {
            "UINT8" => Ok(Self::Uint8),
            "UINT16" => Ok(Self::Uint16),
            "UINT32" => Ok(Self::Uint32),
            other => Err(MeshError::UnknownIndexFormat(other.to_string())),
        }
    }

    /// Bytes per index
    pub const fn size(self) -> usize {
        match self {
            Self::Uint8 => 1,
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }

    fn read(self, bytes: &[u8]) -> u32 {
        match self {
            Self::Uint8 => u32::from(bytes[0]),
            Self::Uint16 => u32::from(bytemuck::pod_read_unaligned::<u16>(bytes)),
            Self::Uint32 => bytemuck::pod_read_unaligned::<u32>(bytes),
        }
    }
}

#[derive(Debug, Clone)]
struct AttributeStream {
    name: AttributeName,
    format: AttributeFormat,
    src: String,
    offset: usize,
    stride: usize,
}

impl AttributeStream {
    /// Decode one element into `vertex`
    fn decode(&self, bytes: &[u8], vertex: &mut Vertex) {
        if self.format == AttributeFormat::R8G8B8A8Unorm {
            let rgba = [bytes[0], bytes[1], bytes[2], bytes[3]];
            match self.name {
                AttributeName::Color => vertex.color = rgba,
                _ => {
                    let unorm = rgba.map(|c| f32::from(c) / 255.0);
                    self.assign_floats(&unorm, vertex);
                }
            }
            return;
        }

        let mut floats = [0.0f32; 4];
        let n = self.format.size() / 4;
        for (i, slot) in floats.iter_mut().enumerate().take(n) {
            *slot = bytemuck::pod_read_unaligned::<f32>(&bytes[i * 4..i * 4 + 4]);
        }
        self.assign_floats(&floats[..n], vertex);
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn assign_floats(&self, values: &[f32], vertex: &mut Vertex) {
        let copy = |dst: &mut [f32]| {
            for (d, s) in dst.iter_mut().zip(values) {
                *d = *s;
            }
        };
        match self.name {
            AttributeName::Position => copy(&mut vertex.position),
            AttributeName::Normal => copy(&mut vertex.normal),
            AttributeName::Tangent => copy(&mut vertex.tangent),
            AttributeName::TexCoord => copy(&mut vertex.tex_coord),
            AttributeName::Color => {
                for (d, s) in vertex.color.iter_mut().zip(values) {
                    *d = (s.clamp(0.0, 1.0) * 255.0).round() as u8;
                }
            }
        }
    }
}

/// Loads MESH objects into a [`GeometrySink`]
#[derive(Debug, Clone)]
pub struct MeshLoader<'a> {
    paths: &'a SearchPaths,
    validation: ValidationLevel,
    debug_bounds: bool,
}

impl<'a> MeshLoader<'a> {
    /// Loader resolving streams through `paths`
    pub const fn new(paths: &'a SearchPaths, validation: ValidationLevel) -> Self {
        Self {
            paths,
            validation,
            debug_bounds: false,
        }
    }

    /// Also append 8 bounds-corner vertices per mesh for wireframe display
    pub const fn with_debug_bounds(mut self, enabled: bool) -> Self {
        self.debug_bounds = enabled;
        self
    }

    /// Load one MESH object and append its geometry to `sink`
    pub fn load(&self, obj: &Object, sink: &mut dyn GeometrySink) -> Result<Mesh, MeshError> {
        let checked = self.validation.is_checked();
        let count = obj.u32("count")? as usize;
        let streams = self.parse_attributes(obj.object("attributes")?)?;

        let mut files = FileCache::new(self.paths);
        let vertices = if let Some(layout) = packed_layout(&streams) {
            log::trace!("Packed read of {count} vertices from {}", layout.src);
            let bytes = files.get(layout.src)?;
            read_packed(&streams, &layout, bytes, count)?
        } else {
            for stream in &streams {
                let len = files.get(&stream.src)?.len();
                check_strided(stream, count, len)?;
            }
            let mut vertices = vec![Vertex::default(); count];
            for stream in &streams {
                read_strided(stream, files.get(&stream.src)?, &mut vertices);
            }
            vertices
        };

        let first_vertex = sink.vertex_count();
        let fits = u32::try_from(vertices.len())
            .ok()
            .and_then(|n| first_vertex.checked_add(n))
            .is_some();
        if checked && !fits {
            return Err(MeshError::IndexOverflow {
                first_vertex,
                vertex_count: vertices.len(),
            });
        }
        let (unique, indices) = match obj.get("indices") {
            Some(indices) => {
                let indices = indices.as_object()?;
                let format = IndexFormat::parse(indices.string("format")?)?;
                let offset = indices.u32("offset")? as usize;
                let bytes = files.get(indices.string("src")?)?;
                let body = bytes.get(offset..).ok_or_else(|| MeshError::Truncated {
                    src: indices.string("src").unwrap_or_default().to_string(),
                    needed: offset,
                    len: bytes.len(),
                })?;

                let mut out = Vec::with_capacity(body.len() / format.size());
                for chunk in body.chunks_exact(format.size()) {
                    let index = format.read(chunk);
                    if checked && index as usize >= vertices.len() {
                        return Err(MeshError::IndexOutOfBounds {
                            index,
                            vertex_count: u32::try_from(vertices.len()).unwrap_or(u32::MAX),
                        });
                    }
                    out.push(index.wrapping_add(first_vertex));
                }
                (vertices, out)
            }
            None => deduplicate(&vertices, first_vertex),
        };

        let mut bounds = Bounds::empty();
        for vertex in &unique {
            bounds.enclose_point(vertex.position.into());
        }
        bounds.fix_zero_volume();

        sink.append_vertices(&unique);
        let range = sink.append_indices(&indices);

        let debug_vertex_offset = self.debug_bounds.then(|| {
            let corners = bounds.corners().map(|c| Vertex::at(c.into()));
            sink.append_vertices(&corners)
        });

        log::debug!(
            "Loaded mesh: {} vertices ({} unique), {} indices at {}",
            count,
            unique.len(),
            range.count,
            range.offset
        );

        Ok(Mesh {
            bounds,
            range,
            material: None,
            debug_vertex_offset,
        })
    }

    fn parse_attributes(&self, attributes: &Object) -> Result<Vec<AttributeStream>, MeshError> {
        let mut streams = Vec::with_capacity(attributes.len());
        for (key, value) in attributes.iter() {
            let Some(name) = AttributeName::parse(key) else {
                if self.validation.is_checked() {
                    return Err(MeshError::UnknownAttribute(key.to_string()));
                }
                log::debug!("Skipping unknown vertex attribute {key}");
                continue;
            };
            let info = value.as_object()?;
            streams.push(AttributeStream {
                name,
                format: AttributeFormat::parse(info.string("format")?)?,
                src: info.string("src")?.to_string(),
                offset: info.u32("offset")? as usize,
                stride: info.u32("stride")? as usize,
            });
        }
        if !streams.iter().any(|s| s.name == AttributeName::Position) {
            return Err(MeshError::MissingPosition);
        }
        streams.sort_by_key(|s| s.offset);
        Ok(streams)
    }
}

struct PackedLayout<'s> {
    src: &'s str,
    base: usize,
    stride: usize,
}

/// Streams form one interleaved record when they share a file and a stride and their
/// elements sit back to back, filling the stride exactly. Expects offset-sorted streams.
fn packed_layout(streams: &[AttributeStream]) -> Option<PackedLayout<'_>> {
    let first = streams.first()?;
    let mut expected = first.offset;
    for stream in streams {
        if stream.src != first.src || stream.stride != first.stride || stream.offset != expected {
            return None;
        }
        expected += stream.format.size();
    }
    (expected - first.offset == first.stride).then_some(PackedLayout {
        src: &first.src,
        base: first.offset,
        stride: first.stride,
    })
}

fn read_packed(
    streams: &[AttributeStream],
    layout: &PackedLayout<'_>,
    bytes: &[u8],
    count: usize,
) -> Result<Vec<Vertex>, MeshError> {
    let needed = count
        .checked_mul(layout.stride)
        .and_then(|n| n.checked_add(layout.base))
        .unwrap_or(usize::MAX);
    let block = bytes.get(layout.base..needed).ok_or_else(|| MeshError::Truncated {
        src: layout.src.to_string(),
        needed,
        len: bytes.len(),
    })?;

    let mut vertices = Vec::with_capacity(count);
    for record in block.chunks_exact(layout.stride) {
        let mut vertex = Vertex::default();
        for stream in streams {
            let at = stream.offset - layout.base;
            stream.decode(&record[at..at + stream.format.size()], &mut vertex);
        }
        vertices.push(vertex);
    }
    Ok(vertices)
}

/// Fail unless `count` elements of `stream` fit in a file of `len` bytes
fn check_strided(stream: &AttributeStream, count: usize, len: usize) -> Result<(), MeshError> {
    let Some(last) = count.checked_sub(1) else {
        return Ok(());
    };
    let needed = last
        .checked_mul(stream.stride)
        .and_then(|n| n.checked_add(stream.offset))
        .and_then(|n| n.checked_add(stream.format.size()))
        .unwrap_or(usize::MAX);
    if needed > len {
        return Err(MeshError::Truncated {
            src: stream.src.clone(),
            needed,
            len,
        });
    }
    Ok(())
}

/// Expects `bytes` to have passed [`check_strided`] for `vertices.len()` elements
fn read_strided(stream: &AttributeStream, bytes: &[u8], vertices: &mut [Vertex]) {
    let size = stream.format.size();
    for (i, vertex) in vertices.iter_mut().enumerate() {
        let at = stream.offset + i * stream.stride;
        stream.decode(&bytes[at..at + size], vertex);
    }
}

/// Merge bit-identical vertices; indices are offset by `first_vertex`
fn deduplicate(vertices: &[Vertex], first_vertex: u32) -> (Vec<Vertex>, Vec<u32>) {
    let mut seen: HashMap<Vertex, u32> = HashMap::with_capacity(vertices.len());
    let mut unique = Vec::new();
    let mut indices = Vec::with_capacity(vertices.len());
    for vertex in vertices {
        let local = *seen.entry(*vertex).or_insert_with(|| {
            unique.push(*vertex);
            u32::try_from(unique.len() - 1).unwrap_or(u32::MAX)
        });
        indices.push(first_vertex.wrapping_add(local));
    }
    (unique, indices)
}

/// Stream files read at most once per mesh
struct FileCache<'a> {
    paths: &'a SearchPaths,
    files: HashMap<String, Vec<u8>>,
}

impl<'a> FileCache<'a> {
    fn new(paths: &'a SearchPaths) -> Self {
        Self {
            paths,
            files: HashMap::new(),
        }
    }

    fn get(&mut self, src: &str) -> Result<&[u8], MeshError> {
        if !self.files.contains_key(src) {
            let path = self.paths.resolve(src, None)?;
            let bytes = std::fs::read(&path).map_err(|source| MeshError::Io { path, source })?;
            self.files.insert(src.to_string(), bytes);
        }
        Ok(self.files.get(src).map(Vec::as_slice).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{GeometryBuffers, IndexRange};
    use crate::json::parse;
    use crate::scene::bounds::MIN_AXIS_SIZE;
    use approx::assert_relative_eq;
    use std::path::Path;

    struct TempDir(PathBuf);

    impl TempDir {
        fn new(tag: &str) -> Self {
            let dir = std::env::temp_dir().join(format!("mesh_loader_{tag}_{}", std::process::id()));
            std::fs::create_dir_all(&dir).unwrap();
            Self(dir)
        }

        fn write(&self, name: &str, bytes: &[u8]) {
            std::fs::write(self.0.join(name), bytes).unwrap();
        }

        fn paths(&self) -> SearchPaths {
            SearchPaths::new(vec![]).with_base(&self.0)
        }

        fn path(&self) -> &Path {
            &self.0
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            std::fs::remove_dir_all(&self.0).ok();
        }
    }

    fn floats(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn mesh_object(text: &str) -> Object {
        parse(text, ValidationLevel::Checked)
            .unwrap()
            .as_object()
            .unwrap()
            .clone()
    }

    /// Two triangles sharing an edge, written as 6 non-indexed position+color records.
    fn quad_bytes() -> Vec<u8> {
        let corners = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ];
        let mut bytes = Vec::new();
        for c in corners {
            bytes.extend(floats(&c));
            bytes.extend([255, 0, 0, 255]);
        }
        bytes
    }

    const QUAD: &str = r#"{ "type": "MESH", "name": "quad", "count": 6,
        "attributes": {
            "POSITION": { "src": "quad.b72", "offset": 0, "stride": 16, "format": "R32G32B32_SFLOAT" },
            "COLOR": { "src": "quad.b72", "offset": 12, "stride": 16, "format": "R8G8B8A8_UNORM" } } }"#;

    #[test]
    fn test_packed_layout_detection() {
        let obj = mesh_object(QUAD);
        let dir = TempDir::new("packed_detect");
        let paths = dir.paths();
        let loader = MeshLoader::new(&paths, ValidationLevel::Checked);
        let streams = loader.parse_attributes(obj.object("attributes").unwrap()).unwrap();
        assert!(packed_layout(&streams).is_some());
    }

    #[test]
    fn test_non_indexed_mesh_is_deduplicated() {
        let dir = TempDir::new("dedup");
        dir.write("quad.b72", &quad_bytes());
        let paths = dir.paths();
        let mut sink = GeometryBuffers::new();

        let mesh = MeshLoader::new(&paths, ValidationLevel::Checked)
            .load(&mesh_object(QUAD), &mut sink)
            .unwrap();

        assert_eq!(sink.vertices.len(), 4);
        assert_eq!(mesh.range, IndexRange { offset: 0, count: 6 });
        assert_eq!(sink.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(sink.vertices[0].color, [255, 0, 0, 255]);
    }

    #[test]
    fn test_bounds_cover_only_this_mesh() {
        let dir = TempDir::new("bounds");
        dir.write("quad.b72", &quad_bytes());
        let paths = dir.paths();
        let mut sink = GeometryBuffers::new();
        sink.append_vertices(&[Vertex::at([-100.0, -100.0, -100.0])]);

        let mesh = MeshLoader::new(&paths, ValidationLevel::Fast)
            .load(&mesh_object(QUAD), &mut sink)
            .unwrap();

        assert_relative_eq!(mesh.bounds.min.x, 0.0);
        assert_relative_eq!(mesh.bounds.max.y, 1.0);
        assert!(mesh.bounds.max.z - mesh.bounds.min.z >= MIN_AXIS_SIZE);
        // indices are rebased past the pre-existing vertex
        assert_eq!(sink.indices_in(mesh.range)[0], 1);
    }

    #[test]
    fn test_index_stream_rebased_by_vertex_count() {
        let dir = TempDir::new("indexed");
        let positions = floats(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        dir.write("tri.b72", &positions);
        let mut index_bytes = vec![0xAA, 0xBB];
        for i in [0u16, 1, 2] {
            index_bytes.extend(i.to_le_bytes());
        }
        dir.write("tri.idx", &index_bytes);

        let obj = mesh_object(
            r#"{ "count": 3,
                "attributes": { "POSITION": { "src": "tri.b72", "offset": 0, "stride": 12, "format": "R32G32B32_SFLOAT" } },
                "indices": { "src": "tri.idx", "offset": 2, "format": "UINT16" } }"#,
        );
        let paths = dir.paths();
        let mut sink = GeometryBuffers::new();
        sink.append_vertices(&[Vertex::default(); 5]);

        let mesh = MeshLoader::new(&paths, ValidationLevel::Checked)
            .load(&obj, &mut sink)
            .unwrap();

        assert_eq!(sink.indices_in(mesh.range), &[5, 6, 7]);
        assert_eq!(sink.vertices.len(), 8);
    }

    #[test]
    fn test_uint8_and_uint32_indices() {
        let dir = TempDir::new("widths");
        dir.write("tri.b72", &floats(&[0.0; 9]));
        dir.write("tri8.idx", &[2, 1, 0]);
        dir.write("tri32.idx", &[2u32, 1, 0].iter().flat_map(|i| i.to_le_bytes()).collect::<Vec<_>>());
        let paths = dir.paths();
        let loader = MeshLoader::new(&paths, ValidationLevel::Checked);
        let mut sink = GeometryBuffers::new();

        for (src, format) in [("tri8.idx", "UINT8"), ("tri32.idx", "UINT32")] {
            let obj = mesh_object(&format!(
                r#"{{ "count": 3,
                    "attributes": {{ "POSITION": {{ "src": "tri.b72", "offset": 0, "stride": 12, "format": "R32G32B32_SFLOAT" }} }},
                    "indices": {{ "src": "{src}", "offset": 0, "format": "{format}" }} }}"#
            ));
            let before = sink.vertex_count();
            let mesh = loader.load(&obj, &mut sink).unwrap();
            assert_eq!(sink.indices_in(mesh.range), &[before + 2, before + 1, before]);
        }
    }

    #[test]
    fn test_strided_attributes_from_separate_files() {
        let dir = TempDir::new("strided");
        // positions padded to a 16-byte stride, normals in their own file
        let mut positions = Vec::new();
        for p in [[0.0f32, 0.0, 2.0], [1.0, 0.0, 2.0], [0.0, 1.0, 2.0]] {
            positions.extend(floats(&p));
            positions.extend([0u8; 4]);
        }
        dir.write("pos.b72", &positions);
        dir.write("nrm.b72", &floats(&[0.0f32, 0.0, 1.0].repeat(3)));

        let obj = mesh_object(
            r#"{ "count": 3, "attributes": {
                "POSITION": { "src": "pos.b72", "offset": 0, "stride": 16, "format": "R32G32B32_SFLOAT" },
                "NORMAL": { "src": "nrm.b72", "offset": 0, "stride": 12, "format": "R32G32B32_SFLOAT" } } }"#,
        );
        let paths = dir.paths();
        let mut sink = GeometryBuffers::new();
        let mesh = MeshLoader::new(&paths, ValidationLevel::Checked)
            .load(&obj, &mut sink)
            .unwrap();

        assert_eq!(mesh.range.count, 3);
        assert_eq!(sink.vertices[1].position, [1.0, 0.0, 2.0]);
        assert_eq!(sink.vertices[1].normal, [0.0, 0.0, 1.0]);
        assert_relative_eq!(mesh.bounds.center().z, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_truncated_stream_is_error() {
        let dir = TempDir::new("truncated");
        dir.write("quad.b72", &quad_bytes()[..40]);
        let paths = dir.paths();
        let result = MeshLoader::new(&paths, ValidationLevel::Fast)
            .load(&mesh_object(QUAD), &mut GeometryBuffers::new());
        assert!(matches!(result, Err(MeshError::Truncated { .. })));
    }

    #[test]
    fn test_missing_stream_reports_search() {
        let dir = TempDir::new("missing");
        let paths = dir.paths();
        let result = MeshLoader::new(&paths, ValidationLevel::Fast)
            .load(&mesh_object(QUAD), &mut GeometryBuffers::new());
        match result {
            Err(MeshError::NotFound(err)) => assert!(err.tried[0].starts_with(dir.path())),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_checked_rejects_out_of_range_index() {
        let dir = TempDir::new("bad_index");
        dir.write("tri.b72", &floats(&[0.0; 9]));
        dir.write("tri.idx", &[0, 1, 9]);
        let obj = mesh_object(
            r#"{ "count": 3,
                "attributes": { "POSITION": { "src": "tri.b72", "offset": 0, "stride": 12, "format": "R32G32B32_SFLOAT" } },
                "indices": { "src": "tri.idx", "offset": 0, "format": "UINT8" } }"#,
        );
        let paths = dir.paths();
        let result = MeshLoader::new(&paths, ValidationLevel::Checked)
            .load(&obj, &mut GeometryBuffers::new());
        assert!(matches!(result, Err(MeshError::IndexOutOfBounds { index: 9, .. })));
    }

    #[test]
    fn test_index_rebase_overflow() {
        let dir = TempDir::new("rebase_overflow");
        dir.write("tri.b72", &floats(&[0.0; 9]));
        dir.write("tri.idx", &[0u32, 1, u32::MAX].iter().flat_map(|i| i.to_le_bytes()).collect::<Vec<_>>());
        let obj = mesh_object(
            r#"{ "count": 3,
                "attributes": { "POSITION": { "src": "tri.b72", "offset": 0, "stride": 12, "format": "R32G32B32_SFLOAT" } },
                "indices": { "src": "tri.idx", "offset": 0, "format": "UINT32" } }"#,
        );
        let paths = dir.paths();

        let mut sink = GeometryBuffers::new();
        sink.append_vertices(&[Vertex::default()]);
        let result = MeshLoader::new(&paths, ValidationLevel::Checked).load(&obj, &mut sink);
        assert!(matches!(result, Err(MeshError::IndexOutOfBounds { index: u32::MAX, .. })));

        let mut sink = GeometryBuffers::new();
        sink.append_vertices(&[Vertex::default()]);
        let mesh = MeshLoader::new(&paths, ValidationLevel::Fast).load(&obj, &mut sink).unwrap();
        assert_eq!(sink.indices_in(mesh.range), &[1, 2, 0]);
    }

    #[test]
    fn test_huge_count_rejected_before_allocation() {
        let dir = TempDir::new("huge_count");
        dir.write("pos.b72", &floats(&[0.0; 9]));
        dir.write("nrm.b72", &floats(&[0.0; 9]));
        let obj = mesh_object(
            r#"{ "count": 4000000000, "attributes": {
                "POSITION": { "src": "pos.b72", "offset": 0, "stride": 12, "format": "R32G32B32_SFLOAT" },
                "NORMAL": { "src": "nrm.b72", "offset": 0, "stride": 12, "format": "R32G32B32_SFLOAT" } } }"#,
        );
        let paths = dir.paths();
        for validation in [ValidationLevel::Fast, ValidationLevel::Checked] {
            let result = MeshLoader::new(&paths, validation).load(&obj, &mut GeometryBuffers::new());
            assert!(matches!(result, Err(MeshError::Truncated { len: 36, .. })));
        }
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(matches!(
            AttributeFormat::parse("R16G16_SFLOAT"),
            Err(MeshError::UnknownFormat(_))
        ));
        assert!(IndexFormat::parse("UINT64").is_err());
    }

    #[test]
    fn test_debug_bounds_appends_corners() {
        let dir = TempDir::new("debug");
        dir.write("quad.b72", &quad_bytes());
        let paths = dir.paths();
        let mut sink = GeometryBuffers::new();
        let mesh = MeshLoader::new(&paths, ValidationLevel::Fast)
            .with_debug_bounds(true)
            .load(&mesh_object(QUAD), &mut sink)
            .unwrap();
        assert_eq!(mesh.debug_vertex_offset, Some(4));
        assert_eq!(sink.vertices.len(), 12);
    }
}

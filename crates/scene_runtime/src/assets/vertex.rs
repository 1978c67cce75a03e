//! Vertex layout and the geometry sink meshes are loaded into

use std::hash::{Hash, Hasher};

/// Interleaved vertex as stored in the shared vertex buffer
///
/// Implements `Hash` and `Eq` over the bit patterns of its floats so meshes without
/// an index stream can be de-duplicated while loading.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Position in mesh-local space
    pub position: [f32; 3],
    /// Surface normal
    pub normal: [f32; 3],
    /// Tangent, `w` holds the bitangent sign
    pub tangent: [f32; 4],
    /// Texture coordinate
    pub tex_coord: [f32; 2],
    /// RGBA8 color
    pub color: [u8; 4],
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            normal: [0.0, 0.0, 1.0],
            tangent: [1.0, 0.0, 0.0, 1.0],
            tex_coord: [0.0; 2],
            color: [255; 4],
        }
    }
}

impl Vertex {
    /// Vertex at `position` with every other attribute defaulted
    pub fn at(position: [f32; 3]) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }
}

// Bit-pattern equality: -0.0 and 0.0 are distinct keys, which only costs a duplicate vertex.
impl Eq for Vertex {}

impl Hash for Vertex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for v in self
            .position
            .iter()
            .chain(&self.normal)
            .chain(&self.tangent)
            .chain(&self.tex_coord)
        {
            v.to_bits().hash(state);
        }
        self.color.hash(state);
    }
}

/// Contiguous run of indices in the shared index buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexRange {
    /// First index
    pub offset: u32,
    /// Number of indices
    pub count: u32,
}

/// Destination for loaded geometry, normally backed by renderer-owned buffers.
///
/// Loaders only append; they never rewrite or reset what is already there.
pub trait GeometrySink {
    /// Number of vertices appended so far
    fn vertex_count(&self) -> u32;

    /// Append vertices, returning the index of the first one
    fn append_vertices(&mut self, vertices: &[Vertex]) -> u32;

    /// Append indices, returning where they landed
    fn append_indices(&mut self, indices: &[u32]) -> IndexRange;
}

/// CPU-side [`GeometrySink`]
#[derive(Debug, Clone, Default)]
pub struct GeometryBuffers {
    /// All vertices appended so far
    pub vertices: Vec<Vertex>,
    /// All indices appended so far
    pub indices: Vec<u32>,
}

impl GeometryBuffers {
    /// Empty buffers
    pub fn new() -> Self {
        Self::default()
    }

    /// Indices covered by `range`
    pub fn indices_in(&self, range: IndexRange) -> &[u32] {
        let start = range.offset as usize;
        self.indices
            .get(start..start + range.count as usize)
            .unwrap_or_default()
    }
}

fn len_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

impl GeometrySink for GeometryBuffers {
    fn vertex_count(&self) -> u32 {
        len_u32(self.vertices.len())
    }

    fn append_vertices(&mut self, vertices: &[Vertex]) -> u32 {
        let first = self.vertex_count();
        self.vertices.extend_from_slice(vertices);
        first
    }

    fn append_indices(&mut self, indices: &[u32]) -> IndexRange {
        let offset = len_u32(self.indices.len());
        self.indices.extend_from_slice(indices);
        IndexRange {
            offset,
            count: len_u32(indices.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_identical_vertices_hash_equal() {
        let mut set = HashSet::new();
        set.insert(Vertex::at([1.0, 2.0, 3.0]));
        set.insert(Vertex::at([1.0, 2.0, 3.0]));
        set.insert(Vertex::at([1.0, 2.0, 3.5]));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_buffers_append_ranges() {
        let mut buffers = GeometryBuffers::new();
        assert_eq!(buffers.append_vertices(&[Vertex::default(); 3]), 0);
        assert_eq!(buffers.append_vertices(&[Vertex::default(); 2]), 3);
        let first = buffers.append_indices(&[0, 1, 2]);
        let second = buffers.append_indices(&[3, 4, 3]);
        assert_eq!(first, IndexRange { offset: 0, count: 3 });
        assert_eq!(second, IndexRange { offset: 3, count: 3 });
        assert_eq!(buffers.indices_in(second), &[3, 4, 3]);
    }
}

use glam::Vec4;
use std::sync::atomic::{AtomicU64, Ordering};

// Process-wide counter for stable mesh identities; downstream GPU caches key
// on the id, which survives moves of the value.
static NEXT_MESH_ID: AtomicU64 = AtomicU64::new(1);

/// One mesh vertex: world-space position plus the palette index carried into
/// every vertex of its quad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshVertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub palette_index: u16,
}

/// Surface mesh for one chunk: greedy quads as indexed triangles, with the
/// chunk-local essence palette the indices refer to.
#[derive(Debug, Clone)]
pub struct ChunkMeshData {
    id: u64,
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    pub palette: Vec<Vec4>,
}

impl ChunkMeshData {
    pub fn new() -> Self {
        Self {
            id: NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed),
            vertices: Vec::new(),
            indices: Vec::new(),
            palette: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn quad_count(&self) -> usize {
        self.indices.len() / 6
    }

    /// Append a quad (two triangles, six indices) whose four vertices all
    /// carry the same palette index.
    pub fn add_quad(&mut self, corners: [(f32, f32, f32); 4], palette_index: u16) {
        let base = self.vertices.len() as u32;
        for (x, y, z) in corners {
            self.vertices.push(MeshVertex {
                x,
                y,
                z,
                palette_index,
            });
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
}

impl Default for ChunkMeshData {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_survive_moves() {
        let a = ChunkMeshData::new();
        let b = ChunkMeshData::new();
        assert_ne!(a.id(), b.id());

        let id = a.id();
        let moved = a;
        assert_eq!(moved.id(), id);
    }

    #[test]
    fn test_add_quad_emits_six_indices() {
        let mut mesh = ChunkMeshData::new();
        mesh.add_quad(
            [
                (0.0, 0.0, 0.0),
                (1.0, 0.0, 0.0),
                (1.0, 1.0, 0.0),
                (0.0, 1.0, 0.0),
            ],
            3,
        );
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 2, 3, 0]);
        assert!(mesh.vertices.iter().all(|v| v.palette_index == 3));
        assert_eq!(mesh.quad_count(), 1);
    }
}

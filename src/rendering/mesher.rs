//! Greedy surface extraction: per face direction, sweep layers, build a 2D
//! mask of exposed faces annotated with palette indices, and union
//! rectangular runs of identical entries into single quads. Output is
//! deterministic for identical inputs.

use crate::rendering::mesh::ChunkMeshData;
use crate::world::chunk_coord::{ChunkCoord, CHUNK_SIZE};
use crate::world::grid::ChunkedGrid;
use crate::world::palette::EssencePalette;
use glam::Vec4;

const N: usize = CHUNK_SIZE as usize;

/// Mesh one chunk's exposed surface, reading a one-voxel apron into the
/// neighboring chunks for face visibility.
pub fn mesh_chunk(
    coord: &ChunkCoord,
    density: &ChunkedGrid<f32>,
    essence: &ChunkedGrid<Vec4>,
    threshold: f32,
    palette_epsilon: f32,
) -> ChunkMeshData {
    let mut mesh = ChunkMeshData::new();
    let mut palette = EssencePalette::new(palette_epsilon);
    let (bx, by, bz) = coord.base();
    let base = [bx, by, bz];

    // Fixed direction order keeps output byte-identical across runs
    for dir in 0..6 {
        let d = dir / 2;
        let sign: i32 = if dir % 2 == 0 { 1 } else { -1 };
        let u_axis = (d + 1) % 3;
        let v_axis = (d + 2) % 3;

        let mut mask = [[None::<u16>; N]; N];

        for slice in 0..N {
            // Build the exposure mask for this layer
            for v in 0..N {
                for u in 0..N {
                    let mut local = [0i32; 3];
                    local[d] = slice as i32;
                    local[u_axis] = u as i32;
                    local[v_axis] = v as i32;

                    let wx = base[0] + local[0];
                    let wy = base[1] + local[1];
                    let wz = base[2] + local[2];

                    let mut neighbor = [wx, wy, wz];
                    neighbor[d] += sign;

                    let exposed = density.get(wx, wy, wz) >= threshold
                        && density.get(neighbor[0], neighbor[1], neighbor[2]) < threshold;

                    mask[v][u] = if exposed {
                        Some(palette.quantize(essence.get(wx, wy, wz)))
                    } else {
                        None
                    };
                }
            }

            // Greedily merge rectangular runs of identical mask values
            for v in 0..N {
                let mut u = 0;
                while u < N {
                    let Some(index) = mask[v][u] else {
                        u += 1;
                        continue;
                    };

                    let mut width = 1;
                    while u + width < N && mask[v][u + width] == Some(index) {
                        width += 1;
                    }

                    let mut height = 1;
                    'grow: while v + height < N {
                        for du in 0..width {
                            if mask[v + height][u + du] != Some(index) {
                                break 'grow;
                            }
                        }
                        height += 1;
                    }

                    for dv in 0..height {
                        for du in 0..width {
                            mask[v + dv][u + du] = None;
                        }
                    }

                    emit_quad(
                        &mut mesh, base, d, u_axis, v_axis, sign, slice, u, v, width, height,
                        index,
                    );
                    u += width;
                }
            }
        }
    }

    mesh.palette = palette.entries().to_vec();
    mesh
}

#[allow(clippy::too_many_arguments)]
fn emit_quad(
    mesh: &mut ChunkMeshData,
    base: [i32; 3],
    d: usize,
    u_axis: usize,
    v_axis: usize,
    sign: i32,
    slice: usize,
    u: usize,
    v: usize,
    width: usize,
    height: usize,
    palette_index: u16,
) {
    let plane = (base[d] + slice as i32 + if sign > 0 { 1 } else { 0 }) as f32;
    let u0 = (base[u_axis] + u as i32) as f32;
    let v0 = (base[v_axis] + v as i32) as f32;
    let u1 = u0 + width as f32;
    let v1 = v0 + height as f32;

    let corner = |cu: f32, cv: f32| {
        let mut p = [0.0f32; 3];
        p[d] = plane;
        p[u_axis] = cu;
        p[v_axis] = cv;
        (p[0], p[1], p[2])
    };

    // Winding flips with the face direction so normals point out of the solid
    let corners = if sign > 0 {
        [corner(u0, v0), corner(u1, v0), corner(u1, v1), corner(u0, v1)]
    } else {
        [corner(u0, v0), corner(u0, v1), corner(u1, v1), corner(u1, v0)]
    };

    mesh.add_quad(corners, palette_index);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_at(cells: &[(i32, i32, i32)]) -> (ChunkedGrid<f32>, ChunkedGrid<Vec4>) {
        let mut density = ChunkedGrid::new();
        let mut essence = ChunkedGrid::new();
        for &(x, y, z) in cells {
            density.set(x, y, z, 1.0);
            essence.set(x, y, z, Vec4::new(0.5, 0.5, 0.5, 1.0));
        }
        (density, essence)
    }

    #[test]
    fn test_single_voxel_is_a_cube() {
        let (density, essence) = solid_at(&[(5, 5, 5)]);
        let mesh = mesh_chunk(&ChunkCoord::new(0, 0, 0), &density, &essence, 0.5, 0.01);

        assert_eq!(mesh.quad_count(), 6);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        assert_eq!(mesh.palette.len(), 1);
    }

    #[test]
    fn test_adjacent_voxels_merge_faces() {
        let (density, essence) = solid_at(&[(5, 5, 5), (6, 5, 5)]);
        let mesh = mesh_chunk(&ChunkCoord::new(0, 0, 0), &density, &essence, 0.5, 0.01);

        // A 2x1x1 bar greedy-meshes to 6 quads: four merged 2x1 sides and
        // two 1x1 end caps
        assert_eq!(mesh.quad_count(), 6);
    }

    #[test]
    fn test_different_colors_do_not_merge() {
        let mut density = ChunkedGrid::new();
        let mut essence = ChunkedGrid::new();
        density.set(5, 5, 5, 1.0);
        density.set(6, 5, 5, 1.0);
        essence.set(5, 5, 5, Vec4::new(1.0, 0.0, 0.0, 1.0));
        essence.set(6, 5, 5, Vec4::new(0.0, 1.0, 0.0, 1.0));

        let mesh = mesh_chunk(&ChunkCoord::new(0, 0, 0), &density, &essence, 0.5, 0.01);
        // Four sides stay split per voxel (8 quads) plus the two end caps
        assert_eq!(mesh.quad_count(), 10);
        assert_eq!(mesh.palette.len(), 2);
    }

    #[test]
    fn test_buried_voxels_emit_nothing() {
        let mut cells = Vec::new();
        for x in 0..3 {
            for y in 0..3 {
                for z in 0..3 {
                    cells.push((x, y, z));
                }
            }
        }
        let (density, essence) = solid_at(&cells);
        let mesh = mesh_chunk(&ChunkCoord::new(0, 0, 0), &density, &essence, 0.5, 0.01);

        // 3x3x3 block: only the 54 boundary faces survive, merged to 6 quads
        assert_eq!(mesh.quad_count(), 6);
        for quad in 0..6 {
            let a = mesh.vertices[quad * 4];
            let b = mesh.vertices[quad * 4 + 2];
            let area = ((b.x - a.x).abs().max(1.0))
                * ((b.y - a.y).abs().max(1.0))
                * ((b.z - a.z).abs().max(1.0));
            assert_eq!(area, 9.0);
        }
    }

    #[test]
    fn test_faces_hidden_by_neighbor_chunk() {
        // Solid voxel at the +x boundary of chunk (0,0,0), with a solid
        // neighbor in chunk (1,0,0): the shared face must not be emitted.
        let (density, essence) = solid_at(&[(31, 5, 5), (32, 5, 5)]);
        let mesh = mesh_chunk(&ChunkCoord::new(0, 0, 0), &density, &essence, 0.5, 0.01);
        assert_eq!(mesh.quad_count(), 5);
    }

    #[test]
    fn test_output_is_deterministic() {
        let (density, essence) = solid_at(&[(1, 2, 3), (1, 3, 3), (2, 2, 3), (9, 9, 9)]);
        let coord = ChunkCoord::new(0, 0, 0);

        let a = mesh_chunk(&coord, &density, &essence, 0.5, 0.01);
        let b = mesh_chunk(&coord, &density, &essence, 0.5, 0.01);

        assert_eq!(a.vertices, b.vertices);
        assert_eq!(a.indices, b.indices);
        assert_eq!(a.palette, b.palette);
    }

    #[test]
    fn test_empty_chunk_empty_mesh() {
        let density = ChunkedGrid::new();
        let essence = ChunkedGrid::new();
        let mesh = mesh_chunk(&ChunkCoord::new(0, 0, 0), &density, &essence, 0.5, 0.01);
        assert!(mesh.is_empty());
    }
}

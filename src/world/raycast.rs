//! Voxel raycasting over the chunked density grid using 3D DDA traversal.

use crate::world::grid::ChunkedGrid;
use glam::Vec3;

/// First solid voxel along a ray: cell coordinates, face normal of the
/// crossed face, and distance traveled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelHit {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub nx: i32,
    pub ny: i32,
    pub nz: i32,
    pub distance: f32,
}

/// Walk the grid voxel by voxel, advancing the axis with the smallest
/// `t_max`, until a voxel with density >= threshold is found or the ray
/// travels `max_distance`. The hit normal is the negative of the last
/// stepped axis.
pub fn cast_ray(
    grid: &ChunkedGrid<f32>,
    origin: Vec3,
    direction: Vec3,
    threshold: f32,
    max_distance: f32,
) -> Option<VoxelHit> {
    let dir = direction.normalize_or_zero();
    if dir == Vec3::ZERO {
        return None;
    }

    let mut voxel = [
        origin.x.floor() as i32,
        origin.y.floor() as i32,
        origin.z.floor() as i32,
    ];

    // Ray starting inside matter hits immediately with no crossed face
    if grid.get(voxel[0], voxel[1], voxel[2]) >= threshold {
        return Some(VoxelHit {
            x: voxel[0],
            y: voxel[1],
            z: voxel[2],
            nx: 0,
            ny: 0,
            nz: 0,
            distance: 0.0,
        });
    }

    let mut step = [0i32; 3];
    let mut t_max = [f32::INFINITY; 3];
    let mut t_delta = [f32::INFINITY; 3];

    for axis in 0..3 {
        let d = dir[axis];
        let o = origin[axis];
        if d > 0.0 {
            step[axis] = 1;
            t_max[axis] = ((voxel[axis] + 1) as f32 - o) / d;
            t_delta[axis] = 1.0 / d;
        } else if d < 0.0 {
            step[axis] = -1;
            t_max[axis] = (o - voxel[axis] as f32) / -d;
            t_delta[axis] = 1.0 / -d;
        }
    }

    loop {
        let axis = if t_max[0] <= t_max[1] && t_max[0] <= t_max[2] {
            0
        } else if t_max[1] <= t_max[2] {
            1
        } else {
            2
        };

        let distance = t_max[axis];
        if distance >= max_distance {
            return None;
        }

        voxel[axis] += step[axis];
        t_max[axis] += t_delta[axis];

        if grid.get(voxel[0], voxel[1], voxel[2]) >= threshold {
            let mut normal = [0i32; 3];
            normal[axis] = -step[axis];
            return Some(VoxelHit {
                x: voxel[0],
                y: voxel[1],
                z: voxel[2],
                nx: normal[0],
                ny: normal[1],
                nz: normal[2],
                distance,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_along_z_reports_entry_face() {
        let mut grid: ChunkedGrid<f32> = ChunkedGrid::new();
        grid.set(5, 5, 5, 1.0);

        let hit = cast_ray(
            &grid,
            Vec3::new(5.5, 5.5, 0.5),
            Vec3::new(0.0, 0.0, 1.0),
            0.5,
            10.0,
        )
        .unwrap();
        assert_eq!((hit.x, hit.y, hit.z), (5, 5, 5));
        assert_eq!((hit.nx, hit.ny, hit.nz), (0, 0, -1));
        assert!((hit.distance - 4.5).abs() < 1e-4);
    }

    #[test]
    fn test_miss_past_max_distance() {
        let mut grid: ChunkedGrid<f32> = ChunkedGrid::new();
        grid.set(0, 0, 20, 1.0);
        let hit = cast_ray(
            &grid,
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(0.0, 0.0, 1.0),
            0.5,
            10.0,
        );
        assert!(hit.is_none());
    }

    #[test]
    fn test_negative_direction_normal() {
        let mut grid: ChunkedGrid<f32> = ChunkedGrid::new();
        grid.set(0, 0, 0, 1.0);
        let hit = cast_ray(
            &grid,
            Vec3::new(0.5, 5.5, 0.5),
            Vec3::new(0.0, -1.0, 0.0),
            0.5,
            10.0,
        )
        .unwrap();
        assert_eq!((hit.x, hit.y, hit.z), (0, 0, 0));
        assert_eq!((hit.nx, hit.ny, hit.nz), (0, 1, 0));
    }

    #[test]
    fn test_diagonal_ray_crosses_chunk_boundary() {
        let mut grid: ChunkedGrid<f32> = ChunkedGrid::new();
        grid.set(33, 33, 33, 1.0);
        let hit = cast_ray(
            &grid,
            Vec3::new(30.5, 30.5, 30.5),
            Vec3::new(1.0, 1.0, 1.0),
            0.5,
            20.0,
        )
        .unwrap();
        assert_eq!((hit.x, hit.y, hit.z), (33, 33, 33));
    }

    #[test]
    fn test_origin_inside_matter_hits_at_zero() {
        let mut grid: ChunkedGrid<f32> = ChunkedGrid::new();
        grid.set(2, 2, 2, 1.0);
        let hit = cast_ray(
            &grid,
            Vec3::new(2.5, 2.5, 2.5),
            Vec3::new(1.0, 0.0, 0.0),
            0.5,
            10.0,
        )
        .unwrap();
        assert_eq!(hit.distance, 0.0);
        assert_eq!((hit.nx, hit.ny, hit.nz), (0, 0, 0));
    }

    #[test]
    fn test_zero_direction_misses() {
        let grid: ChunkedGrid<f32> = ChunkedGrid::new();
        assert!(cast_ray(&grid, Vec3::ZERO, Vec3::ZERO, 0.5, 10.0).is_none());
    }

    #[test]
    fn test_below_threshold_is_transparent() {
        let mut grid: ChunkedGrid<f32> = ChunkedGrid::new();
        grid.set(0, 0, 3, 0.4);
        grid.set(0, 0, 5, 0.9);
        let hit = cast_ray(
            &grid,
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(0.0, 0.0, 1.0),
            0.5,
            10.0,
        )
        .unwrap();
        assert_eq!(hit.z, 5);
    }
}

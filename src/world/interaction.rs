//! Player-driven voxel edits: place matter against a hit face, destroy the
//! hit voxel, and raycast-composed variants. Every successful edit emits a
//! `voxel_changed` event for the mesh manager.

use crate::core::event::EventDispatcher;
use crate::rendering::mesh_manager::emit_voxel_changed;
use crate::utils::math::Aabb;
use crate::world::chunk_coord::ChunkCoord;
use crate::world::grid::{ChunkedGrid, DensityField, EssenceField};
use crate::world::raycast::{cast_ray, VoxelHit};
use glam::{Vec3, Vec4};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionResult {
    pub success: bool,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub cx: i32,
    pub cy: i32,
    pub cz: i32,
}

impl InteractionResult {
    fn failure() -> Self {
        Self {
            success: false,
            x: 0,
            y: 0,
            z: 0,
            cx: 0,
            cy: 0,
            cz: 0,
        }
    }

    fn success_at(x: i32, y: i32, z: i32) -> Self {
        let chunk = ChunkCoord::from_world(x, y, z);
        Self {
            success: true,
            x,
            y,
            z,
            cx: chunk.x,
            cy: chunk.y,
            cz: chunk.z,
        }
    }
}

/// Write density and essence into the cell adjacent to the hit face.
pub fn create_matter(
    density: &mut DensityField,
    essence: &mut EssenceField,
    dispatcher: &EventDispatcher,
    hit: &VoxelHit,
    value: f32,
    essence_color: Vec4,
) -> InteractionResult {
    let x = hit.x + hit.nx;
    let y = hit.y + hit.ny;
    let z = hit.z + hit.nz;

    density.write(x, y, z, value);
    essence.write(x, y, z, essence_color);

    let result = InteractionResult::success_at(x, y, z);
    emit_voxel_changed(dispatcher, result.cx, result.cy, result.cz);
    result
}

/// Zero the density at the hit voxel.
pub fn destroy_matter(
    density: &mut DensityField,
    dispatcher: &EventDispatcher,
    hit: &VoxelHit,
) -> InteractionResult {
    density.write(hit.x, hit.y, hit.z, 0.0);

    let result = InteractionResult::success_at(hit.x, hit.y, hit.z);
    emit_voxel_changed(dispatcher, result.cx, result.cy, result.cz);
    result
}

/// Raycast then place in one call.
#[allow(clippy::too_many_arguments)]
pub fn create_matter_at(
    density: &mut DensityField,
    essence: &mut EssenceField,
    dispatcher: &EventDispatcher,
    origin: Vec3,
    direction: Vec3,
    value: f32,
    essence_color: Vec4,
    threshold: f32,
    max_distance: f32,
) -> InteractionResult {
    match cast_ray(density.grid(), origin, direction, threshold, max_distance) {
        Some(hit) => create_matter(density, essence, dispatcher, &hit, value, essence_color),
        None => InteractionResult::failure(),
    }
}

/// Raycast then destroy in one call.
pub fn destroy_matter_at(
    density: &mut DensityField,
    dispatcher: &EventDispatcher,
    origin: Vec3,
    direction: Vec3,
    threshold: f32,
    max_distance: f32,
) -> InteractionResult {
    match cast_ray(density.grid(), origin, direction, threshold, max_distance) {
        Some(hit) => destroy_matter(density, dispatcher, &hit),
        None => InteractionResult::failure(),
    }
}

/// Placement guard: would a voxel at this cell intersect the given bounds
/// (typically the player capsule's AABB)?
pub fn would_overlap(vx: i32, vy: i32, vz: i32, bounds: &Aabb) -> bool {
    let voxel = Aabb::new(
        Vec3::new(vx as f32, vy as f32, vz as f32),
        Vec3::new((vx + 1) as f32, (vy + 1) as f32, (vz + 1) as f32),
    );
    voxel.intersects(bounds)
}

/// Line-of-sight style probe used by AI and tools: does the segment reach
/// `to` without crossing solid matter?
pub fn segment_clear(
    grid: &ChunkedGrid<f32>,
    from: Vec3,
    to: Vec3,
    threshold: f32,
) -> bool {
    let delta = to - from;
    let distance = delta.length();
    if distance < 1e-6 {
        return true;
    }
    cast_ray(grid, from, delta, threshold, distance).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::Event;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn collect_events(dispatcher: &EventDispatcher) -> Arc<Mutex<Vec<(i64, i64, i64)>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        dispatcher.add_listener(
            "voxel_changed",
            move |e: &mut Event| {
                sink.lock().push((
                    e.int_data("cx").unwrap(),
                    e.int_data("cy").unwrap(),
                    e.int_data("cz").unwrap(),
                ));
            },
            0,
        );
        seen
    }

    #[test]
    fn test_create_places_against_hit_face() {
        let mut density = DensityField::new();
        let mut essence = EssenceField::new();
        let dispatcher = EventDispatcher::new();
        let seen = collect_events(&dispatcher);

        density.write(5, 5, 5, 1.0);
        let result = create_matter_at(
            &mut density,
            &mut essence,
            &dispatcher,
            Vec3::new(5.5, 5.5, 0.5),
            Vec3::new(0.0, 0.0, 1.0),
            1.0,
            Vec4::new(0.5, 0.5, 0.5, 1.0),
            0.5,
            10.0,
        );

        assert!(result.success);
        assert_eq!((result.x, result.y, result.z), (5, 5, 4));
        assert_eq!(density.read(5, 5, 4), 1.0);
        assert_eq!(essence.read(5, 5, 4), Vec4::new(0.5, 0.5, 0.5, 1.0));
        assert_eq!(*seen.lock(), vec![(0, 0, 0)]);
    }

    #[test]
    fn test_destroy_zeroes_hit_voxel() {
        let mut density = DensityField::new();
        let dispatcher = EventDispatcher::new();
        let seen = collect_events(&dispatcher);

        density.write(40, 0, 0, 1.0);
        let result = destroy_matter_at(
            &mut density,
            &dispatcher,
            Vec3::new(35.5, 0.5, 0.5),
            Vec3::new(1.0, 0.0, 0.0),
            0.5,
            10.0,
        );

        assert!(result.success);
        assert_eq!((result.x, result.y, result.z), (40, 0, 0));
        assert_eq!(density.read(40, 0, 0), 0.0);
        assert_eq!(*seen.lock(), vec![(1, 0, 0)]);
    }

    #[test]
    fn test_miss_reports_failure_and_no_event() {
        let mut density = DensityField::new();
        let dispatcher = EventDispatcher::new();
        let seen = collect_events(&dispatcher);

        let result = destroy_matter_at(
            &mut density,
            &dispatcher,
            Vec3::ZERO,
            Vec3::X,
            0.5,
            5.0,
        );
        assert!(!result.success);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_would_overlap() {
        let player = Aabb::new(Vec3::new(0.2, 0.0, 0.2), Vec3::new(0.8, 1.8, 0.8));
        assert!(would_overlap(0, 0, 0, &player));
        assert!(would_overlap(0, 1, 0, &player));
        assert!(!would_overlap(3, 0, 0, &player));
    }

    #[test]
    fn test_segment_clear_blocked_by_matter() {
        let mut density = DensityField::new();
        density.write(2, 0, 0, 1.0);
        let grid = density.grid();

        assert!(!segment_clear(
            grid,
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(5.5, 0.5, 0.5),
            0.5
        ));
        assert!(segment_clear(
            grid,
            Vec3::new(0.5, 5.5, 0.5),
            Vec3::new(5.5, 5.5, 0.5),
            0.5
        ));
    }
}

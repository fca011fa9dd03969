//! NPC senses: range queries over ECS positions, a view-cone test, and
//! line-of-sight over the density grid.

use crate::ecs::{EntityId, Position, World};
use crate::world::grid::ChunkedGrid;
use crate::world::interaction::segment_clear;
use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerceptionConfig {
    pub sight_range: f32,
    pub sight_angle_deg: f32,
    pub hearing_range: f32,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            sight_range: 20.0,
            sight_angle_deg: 120.0,
            hearing_range: 10.0,
        }
    }
}

/// ECS component carrying per-NPC sense tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PerceptionComponent {
    pub config: PerceptionConfig,
}

/// Entities with a Position within `radius` of the origin.
pub fn entities_in_range(world: &World, origin: Vec3, radius: f32) -> Vec<(EntityId, Vec3)> {
    let radius_sq = radius * radius;
    world
        .entities_with::<Position>()
        .into_iter()
        .filter_map(|entity| {
            let p = world.get::<Position>(entity)?;
            let position = Vec3::new(p.x, p.y, p.z);
            ((position - origin).length_squared() <= radius_sq).then_some((entity, position))
        })
        .collect()
}

/// Rasterize the segment over integer voxels; opaque on the first cell whose
/// density crosses the threshold. Identical endpoints see each other.
pub fn has_line_of_sight(grid: &ChunkedGrid<f32>, from: Vec3, to: Vec3, threshold: f32) -> bool {
    segment_clear(grid, from, to, threshold)
}

/// Sight check: in range, inside the view cone, and unobstructed.
pub fn can_see(
    target_distance: f32,
    target_angle_deg: f32,
    has_los: bool,
    config: &PerceptionConfig,
) -> bool {
    target_distance <= config.sight_range
        && target_angle_deg.abs() <= config.sight_angle_deg / 2.0
        && has_los
}

/// Hearing is pure range.
pub fn can_hear(target_distance: f32, config: &PerceptionConfig) -> bool {
    target_distance <= config.hearing_range
}

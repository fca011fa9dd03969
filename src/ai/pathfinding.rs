//! A* over the 6-connected voxel grid with Manhattan heuristic and unit step
//! cost, plus steering helpers and a waypoint follower.

use crate::world::grid::ChunkedGrid;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::{BinaryHeap, HashMap};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathNode {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

#[derive(Debug, Clone, Default)]
pub struct PathResult {
    pub waypoints: Vec<PathNode>,
    pub found: bool,
    pub nodes_expanded: usize,
}

/// Waypoint follower state; consumers own the waypoint copy.
#[derive(Debug, Clone)]
pub struct PathFollower {
    pub waypoints: Vec<PathNode>,
    pub current_waypoint: usize,
    pub arrival_threshold: f32,
    pub complete: bool,
}

impl Default for PathFollower {
    fn default() -> Self {
        Self {
            waypoints: Vec::new(),
            current_waypoint: 0,
            arrival_threshold: 1.5,
            complete: false,
        }
    }
}

impl PathFollower {
    pub fn from_result(result: &PathResult) -> Self {
        Self {
            waypoints: result.waypoints.clone(),
            ..Self::default()
        }
    }

    pub fn current(&self) -> Option<&PathNode> {
        self.waypoints.get(self.current_waypoint)
    }
}

/// ECS wrapper so path following lives on entities.
#[derive(Debug, Clone, Default)]
pub struct PathFollowerComponent {
    pub follower: PathFollower,
}

struct AStarNode {
    x: i32,
    y: i32,
    z: i32,
    g: f32,
    f: f32,
    parent: i32,
}

struct OpenEntry {
    f: f32,
    order: u64,
    index: usize,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.order == other.order
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    // Min-heap on f; ties broken by insertion order
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .f
            .partial_cmp(&self.f)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| other.order.cmp(&self.order))
    }
}

pub struct Pathfinding;

impl Pathfinding {
    /// A cell is walkable iff its density is strictly below the threshold.
    pub fn is_walkable(grid: &ChunkedGrid<f32>, x: i32, y: i32, z: i32, threshold: f32) -> bool {
        grid.get(x, y, z) < threshold
    }

    fn heuristic(x: i32, y: i32, z: i32, gx: i32, gy: i32, gz: i32) -> f32 {
        ((x - gx).abs() + (y - gy).abs() + (z - gz).abs()) as f32
    }

    /// Bounded A*. Unwalkable start/goal or an exhausted node budget yield
    /// `found = false`; closed nodes reopen only on strict g improvement.
    #[allow(clippy::too_many_arguments)]
    pub fn find_path(
        grid: &ChunkedGrid<f32>,
        sx: i32,
        sy: i32,
        sz: i32,
        gx: i32,
        gy: i32,
        gz: i32,
        threshold: f32,
        max_nodes: usize,
    ) -> PathResult {
        let mut result = PathResult::default();

        if !Self::is_walkable(grid, sx, sy, sz, threshold)
            || !Self::is_walkable(grid, gx, gy, gz, threshold)
        {
            return result;
        }

        if (sx, sy, sz) == (gx, gy, gz) {
            result.found = true;
            result.waypoints.push(PathNode { x: sx, y: sy, z: sz });
            return result;
        }

        const DIRS: [(i32, i32, i32); 6] = [
            (1, 0, 0),
            (-1, 0, 0),
            (0, 1, 0),
            (0, -1, 0),
            (0, 0, 1),
            (0, 0, -1),
        ];

        let mut nodes: Vec<AStarNode> = Vec::new();
        let mut visited: HashMap<(i32, i32, i32), usize> = HashMap::new();
        let mut open = BinaryHeap::new();
        let mut push_order: u64 = 0;

        let h = Self::heuristic(sx, sy, sz, gx, gy, gz);
        nodes.push(AStarNode {
            x: sx,
            y: sy,
            z: sz,
            g: 0.0,
            f: h,
            parent: -1,
        });
        visited.insert((sx, sy, sz), 0);
        open.push(OpenEntry {
            f: h,
            order: push_order,
            index: 0,
        });

        while let Some(entry) = open.pop() {
            let current = &nodes[entry.index];

            if (current.x, current.y, current.z) == (gx, gy, gz) {
                result.found = true;
                let mut index = entry.index as i32;
                while index >= 0 {
                    let node = &nodes[index as usize];
                    result.waypoints.push(PathNode {
                        x: node.x,
                        y: node.y,
                        z: node.z,
                    });
                    index = node.parent;
                }
                result.waypoints.reverse();
                return result;
            }

            if result.nodes_expanded >= max_nodes {
                return result;
            }
            result.nodes_expanded += 1;

            // Stale heap entry for a node that was since improved
            if current.f > entry.f + 1e-5 {
                continue;
            }

            let (cx, cy, cz, cg) = (current.x, current.y, current.z, current.g);
            for (dx, dy, dz) in DIRS {
                let (nx, ny, nz) = (cx + dx, cy + dy, cz + dz);
                if !Self::is_walkable(grid, nx, ny, nz, threshold) {
                    continue;
                }

                let ng = cg + 1.0;
                match visited.get(&(nx, ny, nz)) {
                    Some(&existing) => {
                        if nodes[existing].g <= ng {
                            continue;
                        }
                        let nf = ng + Self::heuristic(nx, ny, nz, gx, gy, gz);
                        nodes[existing].g = ng;
                        nodes[existing].f = nf;
                        nodes[existing].parent = entry.index as i32;
                        push_order += 1;
                        open.push(OpenEntry {
                            f: nf,
                            order: push_order,
                            index: existing,
                        });
                    }
                    None => {
                        let nf = ng + Self::heuristic(nx, ny, nz, gx, gy, gz);
                        let new_index = nodes.len();
                        nodes.push(AStarNode {
                            x: nx,
                            y: ny,
                            z: nz,
                            g: ng,
                            f: nf,
                            parent: entry.index as i32,
                        });
                        visited.insert((nx, ny, nz), new_index);
                        push_order += 1;
                        open.push(OpenEntry {
                            f: nf,
                            order: push_order,
                            index: new_index,
                        });
                    }
                }
            }
        }

        result
    }

    /// Full-speed velocity toward the target; zero when coincident.
    pub fn seek(current: Vec3, target: Vec3, max_speed: f32) -> Vec3 {
        let to_target = target - current;
        if to_target.length_squared() < 1e-12 {
            return Vec3::ZERO;
        }
        to_target.normalize() * max_speed
    }

    /// Seek scaled down linearly inside the slow radius.
    pub fn arrive(current: Vec3, target: Vec3, max_speed: f32, slow_radius: f32) -> Vec3 {
        let distance = (target - current).length();
        let scale = if slow_radius > 0.0 {
            (distance / slow_radius).min(1.0)
        } else {
            1.0
        };
        Self::seek(current, target, max_speed) * scale
    }

    /// Advance past every waypoint within the arrival threshold; mark the
    /// follower complete once past the last.
    pub fn advance_path_follower(follower: &mut PathFollower, current_pos: Vec3) {
        while let Some(waypoint) = follower.waypoints.get(follower.current_waypoint) {
            let target = Vec3::new(waypoint.x as f32, waypoint.y as f32, waypoint.z as f32);
            if (target - current_pos).length() <= follower.arrival_threshold {
                follower.current_waypoint += 1;
            } else {
                return;
            }
        }
        follower.complete = true;
    }
}

//! Radius-based chunk load/unload scheduling around a moving viewer, with
//! per-tick budgets and distance-priority ordering.

use crate::config::StreamingConfig;
use crate::world::chunk_coord::{ChunkCoord, CHUNK_SIZE};
use std::collections::HashSet;

/// One tick's worth of chunk lifecycle work: `to_load` sorted nearest-first,
/// `to_unload` sorted farthest-first. Already applied to the tracked set.
#[derive(Debug, Default, Clone)]
pub struct StreamingUpdate {
    pub to_load: Vec<ChunkCoord>,
    pub to_unload: Vec<ChunkCoord>,
}

pub struct ChunkStreamingManager {
    config: StreamingConfig,
    current_radius: i32,
    tracked: HashSet<ChunkCoord>,
}

impl ChunkStreamingManager {
    pub fn new(config: StreamingConfig) -> Self {
        Self {
            config,
            current_radius: 0,
            tracked: HashSet::new(),
        }
    }

    /// Compute the desired chunk cube around the viewer (radius grows with
    /// speed up to the cap), diff it against the tracked set, and return the
    /// budget-truncated load/unload lists.
    pub fn update(&mut self, view_x: f32, view_y: f32, view_z: f32, speed: f32) -> StreamingUpdate {
        let radius = ((self.config.base_radius as f32 + speed * self.config.speed_scale) as i32)
            .min(self.config.max_radius);
        self.current_radius = radius;

        let center = ChunkCoord::new(
            (view_x / CHUNK_SIZE as f32).floor() as i32,
            (view_y / CHUNK_SIZE as f32).floor() as i32,
            (view_z / CHUNK_SIZE as f32).floor() as i32,
        );

        let mut desired = HashSet::new();
        for dz in -radius..=radius {
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    desired.insert(ChunkCoord::new(center.x + dx, center.y + dy, center.z + dz));
                }
            }
        }

        let mut to_load: Vec<ChunkCoord> = desired
            .iter()
            .filter(|c| !self.tracked.contains(c))
            .copied()
            .collect();
        to_load.sort_unstable_by_key(|c| (c.distance_sq(&center), *c));

        let mut to_unload: Vec<ChunkCoord> = self
            .tracked
            .iter()
            .filter(|c| !desired.contains(c))
            .copied()
            .collect();
        to_unload.sort_unstable_by_key(|c| (std::cmp::Reverse(c.distance_sq(&center)), *c));

        to_load.truncate(self.config.max_loads_per_tick);
        to_unload.truncate(self.config.max_unloads_per_tick);

        for coord in &to_load {
            self.tracked.insert(*coord);
        }
        for coord in &to_unload {
            self.tracked.remove(coord);
        }

        StreamingUpdate { to_load, to_unload }
    }

    pub fn current_radius(&self) -> i32 {
        self.current_radius
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_tracked(&self, coord: &ChunkCoord) -> bool {
        self.tracked.contains(coord)
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide_open_config(base_radius: i32) -> StreamingConfig {
        StreamingConfig {
            base_radius,
            max_radius: 4,
            speed_scale: 0.5,
            max_loads_per_tick: 10000,
            max_unloads_per_tick: 10000,
        }
    }

    #[test]
    fn test_streaming_cycle() {
        let mut manager = ChunkStreamingManager::new(wide_open_config(2));

        // Fresh manager: full 5x5x5 cube to load, nothing to unload
        let first = manager.update(0.0, 0.0, 0.0, 0.0);
        assert_eq!(first.to_load.len(), 125);
        assert!(first.to_unload.is_empty());

        // Converged: both lists empty
        let second = manager.update(0.0, 0.0, 0.0, 0.0);
        assert!(second.to_load.is_empty());
        assert!(second.to_unload.is_empty());

        // Teleport far away: the old cube unloads
        let third = manager.update(10000.0, 0.0, 0.0, 0.0);
        assert_eq!(third.to_unload.len(), 125);
        assert_eq!(third.to_load.len(), 125);
    }

    #[test]
    fn test_load_order_is_nearest_first() {
        let mut manager = ChunkStreamingManager::new(wide_open_config(2));
        let update = manager.update(0.0, 0.0, 0.0, 0.0);

        let center = ChunkCoord::new(0, 0, 0);
        let distances: Vec<i64> = update
            .to_load
            .iter()
            .map(|c| c.distance_sq(&center))
            .collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(update.to_load[0], center);
    }

    #[test]
    fn test_unload_order_is_farthest_first() {
        let mut manager = ChunkStreamingManager::new(wide_open_config(1));
        manager.update(0.0, 0.0, 0.0, 0.0);
        let update = manager.update(320.0, 0.0, 0.0, 0.0);

        let center = ChunkCoord::new(10, 0, 0);
        let distances: Vec<i64> = update
            .to_unload
            .iter()
            .map(|c| c.distance_sq(&center))
            .collect();
        assert!(distances.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_budgets_truncate_and_converge() {
        let config = StreamingConfig {
            base_radius: 1,
            max_radius: 4,
            speed_scale: 0.0,
            max_loads_per_tick: 5,
            max_unloads_per_tick: 5,
        };
        let mut manager = ChunkStreamingManager::new(config);

        // 27 desired chunks, 5 per tick: fully tracked after 6 ticks
        let mut loaded = 0;
        for _ in 0..6 {
            let update = manager.update(0.0, 0.0, 0.0, 0.0);
            assert!(update.to_load.len() <= 5);
            loaded += update.to_load.len();
        }
        assert_eq!(loaded, 27);
        assert!(manager.update(0.0, 0.0, 0.0, 0.0).to_load.is_empty());
    }

    #[test]
    fn test_speed_grows_radius_up_to_cap() {
        let mut manager = ChunkStreamingManager::new(wide_open_config(2));
        manager.update(0.0, 0.0, 0.0, 0.0);
        assert_eq!(manager.current_radius(), 2);

        manager.update(0.0, 0.0, 0.0, 2.0);
        assert_eq!(manager.current_radius(), 3);

        manager.update(0.0, 0.0, 0.0, 100.0);
        assert_eq!(manager.current_radius(), 4);
    }

    #[test]
    fn test_no_coord_in_both_lists() {
        let mut manager = ChunkStreamingManager::new(wide_open_config(2));
        manager.update(0.0, 0.0, 0.0, 0.0);
        let update = manager.update(64.0, 0.0, 0.0, 0.0);

        let loads: HashSet<_> = update.to_load.iter().collect();
        assert!(update.to_unload.iter().all(|c| !loads.contains(c)));
    }
}

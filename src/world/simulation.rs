//! Ordered named rules executed once per voxel of every active chunk per
//! tick, across the union of density and essence activity.

use crate::world::chunk_coord::{ChunkCoord, CHUNK_SIZE};
use crate::world::grid::{DensityField, EssenceField};
use std::collections::BTreeSet;

pub type SimRule =
    Box<dyn FnMut(&mut DensityField, &mut EssenceField, i32, i32, i32, f64) + Send>;

pub struct SimulationHarness {
    density: DensityField,
    essence: EssenceField,
    rules: Vec<(String, SimRule)>,
}

impl Default for SimulationHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationHarness {
    pub fn new() -> Self {
        Self {
            density: DensityField::new(),
            essence: EssenceField::new(),
            rules: Vec::new(),
        }
    }

    /// Rules run in registration order for every cell.
    pub fn register_rule<F>(&mut self, name: &str, rule: F)
    where
        F: FnMut(&mut DensityField, &mut EssenceField, i32, i32, i32, f64) + Send + 'static,
    {
        self.rules.push((name.to_string(), Box::new(rule)));
    }

    pub fn remove_rule(&mut self, name: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|(n, _)| n != name);
        self.rules.len() != before
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Apply every rule to every cell of every chunk active in either field.
    /// Chunk order is sorted ascending so runs are deterministic.
    pub fn tick(&mut self, dt: f64) {
        if self.rules.is_empty() {
            return;
        }

        let mut merged: BTreeSet<ChunkCoord> = BTreeSet::new();
        merged.extend(self.density.grid().active_chunks());
        merged.extend(self.essence.grid().active_chunks());

        for coord in merged {
            let (bx, by, bz) = coord.base();
            for lz in 0..CHUNK_SIZE {
                for ly in 0..CHUNK_SIZE {
                    for lx in 0..CHUNK_SIZE {
                        let (wx, wy, wz) = (bx + lx, by + ly, bz + lz);
                        for (_, rule) in &mut self.rules {
                            rule(&mut self.density, &mut self.essence, wx, wy, wz, dt);
                        }
                    }
                }
            }
        }
    }

    pub fn density(&self) -> &DensityField {
        &self.density
    }

    pub fn density_mut(&mut self) -> &mut DensityField {
        &mut self.density
    }

    pub fn essence(&self) -> &EssenceField {
        &self.essence
    }

    pub fn essence_mut(&mut self) -> &mut EssenceField {
        &mut self.essence
    }

    /// Split borrow for callers that edit both fields together.
    pub fn fields_mut(&mut self) -> (&mut DensityField, &mut EssenceField) {
        (&mut self.density, &mut self.essence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::chunk_coord::CHUNK_VOLUME;
    use glam::Vec4;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_no_rules_is_noop() {
        let mut sim = SimulationHarness::new();
        sim.density_mut().write(0, 0, 0, 1.0);
        sim.tick(0.1);
        assert_eq!(sim.density().read(0, 0, 0), 1.0);
    }

    #[test]
    fn test_rules_visit_every_cell_of_active_chunks() {
        let mut sim = SimulationHarness::new();
        sim.density_mut().write(0, 0, 0, 1.0);
        sim.density_mut().write(40, 0, 0, 1.0);

        let visits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&visits);
        sim.register_rule("count", move |_d, _e, _x, _y, _z, _dt| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        sim.tick(0.016);
        assert_eq!(visits.load(Ordering::Relaxed), 2 * CHUNK_VOLUME);
    }

    #[test]
    fn test_union_includes_essence_only_chunks() {
        let mut sim = SimulationHarness::new();
        sim.essence_mut().write(100, 0, 0, Vec4::ONE);

        let visits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&visits);
        sim.register_rule("count", move |_d, _e, _x, _y, _z, _dt| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        sim.tick(0.016);
        assert_eq!(visits.load(Ordering::Relaxed), CHUNK_VOLUME);
    }

    #[test]
    fn test_rules_run_in_registration_order() {
        let mut sim = SimulationHarness::new();
        sim.density_mut().write(0, 0, 0, 1.0);

        // First rule doubles, second adds one: order-sensitive result
        sim.register_rule("double", |d, _e, x, y, z, _dt| {
            if (x, y, z) == (0, 0, 0) {
                let v = d.read(x, y, z);
                d.write(x, y, z, v * 2.0);
            }
        });
        sim.register_rule("inc", |d, _e, x, y, z, _dt| {
            if (x, y, z) == (0, 0, 0) {
                let v = d.read(x, y, z);
                d.write(x, y, z, v + 1.0);
            }
        });

        sim.tick(0.016);
        assert_eq!(sim.density().read(0, 0, 0), 3.0);
    }

    #[test]
    fn test_decay_rule() {
        let mut sim = SimulationHarness::new();
        sim.density_mut().write(3, 3, 3, 1.0);
        sim.register_rule("decay", |d, _e, x, y, z, dt| {
            let v = d.read(x, y, z);
            if v > 0.0 {
                d.write(x, y, z, v - dt as f32);
            }
        });

        sim.tick(0.25);
        assert!((sim.density().read(3, 3, 3) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_remove_rule() {
        let mut sim = SimulationHarness::new();
        sim.register_rule("noop", |_d, _e, _x, _y, _z, _dt| {});
        assert_eq!(sim.rule_count(), 1);
        assert!(sim.remove_rule("noop"));
        assert!(!sim.remove_rule("noop"));
        assert_eq!(sim.rule_count(), 0);
    }

    #[test]
    fn test_neighbor_reads_safe_at_borders() {
        let mut sim = SimulationHarness::new();
        sim.density_mut().write(31, 0, 0, 1.0);

        sim.register_rule("probe", |d, _e, x, y, z, _dt| {
            // Reading across the chunk border must not allocate or panic
            let _ = d.grid().neighbors(x, y, z);
        });
        sim.tick(0.016);
        assert_eq!(sim.density().grid().active_chunk_count(), 1);
    }
}

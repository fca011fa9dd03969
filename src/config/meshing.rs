use serde::{Deserialize, Serialize};

/// Tuning for dirty-chunk remeshing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    pub max_remesh_per_tick: usize,
    pub density_threshold: f32,
    pub palette_epsilon: f32,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            max_remesh_per_tick: 4,
            density_threshold: 0.5,
            palette_epsilon: 0.01,
        }
    }
}

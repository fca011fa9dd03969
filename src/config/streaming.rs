use serde::{Deserialize, Serialize};

/// Tuning for the radius-based chunk streaming scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    pub base_radius: i32,
    pub max_radius: i32,
    pub speed_scale: f32,
    pub max_loads_per_tick: usize,
    pub max_unloads_per_tick: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            base_radius: 8,
            max_radius: 16,
            speed_scale: 0.5,
            max_loads_per_tick: 4,
            max_unloads_per_tick: 4,
        }
    }
}

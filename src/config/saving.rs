use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Save directory and autosave tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    pub save_directory: PathBuf,
    pub autosave_interval: f32,
    pub autosave_enabled: bool,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            save_directory: default_save_directory(),
            autosave_interval: 300.0,
            autosave_enabled: false,
        }
    }
}

fn default_save_directory() -> PathBuf {
    ProjectDirs::from("", "", "fabric")
        .map(|dirs| dirs.data_dir().join("saves"))
        .unwrap_or_else(|| PathBuf::from("saves"))
}

use crate::config::{CharacterConfig, MeshConfig, SaveConfig, StreamingConfig};
use crate::utils::error::{FabricError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Aggregate runtime configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub streaming: StreamingConfig,
    pub meshing: MeshConfig,
    pub character: CharacterConfig,
    pub saving: SaveConfig,
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| FabricError::NotFound(format!("config {}: {}", path.display(), e)))?;
        toml::from_str(&text)
            .map_err(|e| FabricError::Internal(format!("config {}: {}", path.display(), e)))
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self)
            .map_err(|e| FabricError::Internal(format!("config serialize: {}", e)))?;
        fs::write(path, text)
            .map_err(|e| FabricError::PermissionDenied(format!("config {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");

        let mut config = EngineConfig::default();
        config.streaming.base_radius = 3;
        config.meshing.max_remesh_per_tick = 7;
        config.save_to_file(&path).unwrap();

        let loaded = EngineConfig::from_file(&path).unwrap();
        assert_eq!(loaded.streaming.base_radius, 3);
        assert_eq!(loaded.meshing.max_remesh_per_tick, 7);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = EngineConfig::from_file(Path::new("/nonexistent/engine.toml")).unwrap_err();
        assert!(matches!(err, FabricError::NotFound(_)));
    }
}

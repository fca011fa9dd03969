//! Named save slots on disk: a JSON envelope (version, slot, timestamp)
//! around the serialized scene, plus a rotating two-slot autosave.

use crate::core::temporal::Timeline;
use crate::ecs::World;
use crate::save::serializer::{LoadedPlayer, SceneSerializer};
use crate::utils::error::{FabricError, Result};
use crate::world::grid::{DensityField, EssenceField};
use chrono::Utc;
use glam::Vec3;
use log::{info, warn};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const SAVE_VERSION: &str = "1.0";
const SAVE_EXTENSION: &str = "json";

/// Metadata for one save slot on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotInfo {
    pub name: String,
    pub timestamp: String,
    pub version: String,
    pub size_bytes: u64,
}

pub struct SaveManager {
    save_directory: PathBuf,
    autosave_enabled: bool,
    autosave_interval: f32,
    autosave_timer: f32,
    autosave_index: u32,
}

impl SaveManager {
    pub fn new(save_directory: &Path) -> Self {
        if let Err(e) = fs::create_dir_all(save_directory) {
            warn!(
                "failed to create save directory {}: {}",
                save_directory.display(),
                e
            );
        }
        Self {
            save_directory: save_directory.to_path_buf(),
            autosave_enabled: false,
            autosave_interval: 300.0,
            autosave_timer: 0.0,
            autosave_index: 0,
        }
    }

    /// Serialize the full scene into `<dir>/<slot>.json`. The timeline is
    /// paused for the duration and resumed only if it was running before.
    #[allow(clippy::too_many_arguments)]
    pub fn save(
        &self,
        slot: &str,
        world: &World,
        density: &DensityField,
        essence: &EssenceField,
        timeline: &Timeline,
        player_pos: Option<Vec3>,
        player_vel: Option<Vec3>,
    ) -> Result<()> {
        let was_paused = timeline.is_paused();
        if !was_paused {
            timeline.pause();
        }

        let mut scene =
            SceneSerializer::serialize(world, density, essence, timeline, player_pos, player_vel);
        // The scene was captured under the save-time pause; record the pause
        // state the player actually had
        if let Some(timeline_json) = scene.get_mut("timeline") {
            timeline_json["isPaused"] = json!(was_paused);
        }
        let envelope = json!({
            "save_version": SAVE_VERSION,
            "slot": slot,
            "timestamp": Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            "scene": scene,
        });

        let path = self.slot_path(slot);
        let result = serde_json::to_string_pretty(&envelope)
            .map_err(|e| FabricError::Internal(format!("serialize slot '{}': {}", slot, e)))
            .and_then(|text| {
                fs::write(&path, text).map_err(|e| {
                    FabricError::PermissionDenied(format!("write {}: {}", path.display(), e))
                })
            });

        if !was_paused {
            timeline.resume();
        }

        match &result {
            Ok(()) => info!("saved slot '{}' to {}", slot, path.display()),
            Err(e) => warn!("failed to save slot '{}': {}", slot, e),
        }
        result
    }

    /// Load `<dir>/<slot>.json`, rejecting any envelope whose version
    /// differs, and apply the scene.
    pub fn load(
        &self,
        slot: &str,
        world: &mut World,
        density: &mut DensityField,
        essence: &mut EssenceField,
        timeline: &Timeline,
    ) -> Result<LoadedPlayer> {
        let path = self.slot_path(slot);
        let text = fs::read_to_string(&path)
            .map_err(|e| FabricError::NotFound(format!("slot '{}': {}", slot, e)))?;
        let envelope: Value = serde_json::from_str(&text)
            .map_err(|e| FabricError::Internal(format!("slot '{}': {}", slot, e)))?;

        let version = envelope
            .get("save_version")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                FabricError::InvalidState(format!("slot '{}' missing save_version", slot))
            })?;
        if version != SAVE_VERSION {
            return Err(FabricError::InvalidState(format!(
                "save version mismatch: expected '{}', got '{}'",
                SAVE_VERSION, version
            )));
        }

        let scene = envelope.get("scene").ok_or_else(|| {
            FabricError::InvalidState(format!("slot '{}' missing scene data", slot))
        })?;

        let player = SceneSerializer::deserialize(scene, world, density, essence, timeline)
            .ok_or_else(|| {
                FabricError::Internal(format!("slot '{}' scene failed to deserialize", slot))
            })?;

        info!("loaded slot '{}' from {}", slot, path.display());
        Ok(player)
    }

    /// Enable rotation between `autosave_0` and `autosave_1`.
    pub fn enable_autosave(&mut self, interval_seconds: f32) {
        self.autosave_enabled = true;
        self.autosave_interval = interval_seconds;
        self.autosave_timer = 0.0;
    }

    pub fn disable_autosave(&mut self) {
        self.autosave_enabled = false;
    }

    /// Accumulate time and fire a save exactly when the interval elapses.
    /// The slot is picked from the current index, saved, and only then is
    /// the index advanced.
    #[allow(clippy::too_many_arguments)]
    pub fn tick_autosave(
        &mut self,
        dt: f32,
        world: &World,
        density: &DensityField,
        essence: &EssenceField,
        timeline: &Timeline,
        player_pos: Option<Vec3>,
        player_vel: Option<Vec3>,
    ) -> bool {
        if !self.autosave_enabled {
            return false;
        }

        self.autosave_timer += dt;
        if self.autosave_timer < self.autosave_interval {
            return false;
        }
        self.autosave_timer = 0.0;

        let slot = format!("autosave_{}", self.autosave_index);
        let saved = self
            .save(&slot, world, density, essence, timeline, player_pos, player_vel)
            .is_ok();
        self.autosave_index = (self.autosave_index + 1) % 2;
        saved
    }

    /// Scan the directory for `*.json` saves and read each envelope's
    /// metadata.
    pub fn list_slots(&self) -> Vec<SlotInfo> {
        let Ok(entries) = fs::read_dir(&self.save_directory) else {
            return Vec::new();
        };

        let mut slots = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != SAVE_EXTENSION) {
                continue;
            }
            let Ok(text) = fs::read_to_string(&path) else {
                warn!("skipping unreadable save file {}", path.display());
                continue;
            };
            let Ok(envelope) = serde_json::from_str::<Value>(&text) else {
                warn!("skipping malformed save file {}", path.display());
                continue;
            };

            slots.push(SlotInfo {
                name: path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                timestamp: envelope
                    .get("timestamp")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
                version: envelope
                    .get("save_version")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
                size_bytes: entry.metadata().map(|m| m.len()).unwrap_or(0),
            });
        }
        slots.sort_by(|a, b| a.name.cmp(&b.name));
        slots
    }

    pub fn delete_slot(&self, slot: &str) -> bool {
        let path = self.slot_path(slot);
        match fs::remove_file(&path) {
            Ok(()) => true,
            Err(_) => {
                warn!("failed to delete slot '{}'", slot);
                false
            }
        }
    }

    fn slot_path(&self, slot: &str) -> PathBuf {
        self.save_directory
            .join(format!("{}.{}", slot, SAVE_EXTENSION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Position;

    struct Fixture {
        _dir: tempfile::TempDir,
        manager: SaveManager,
        world: World,
        density: DensityField,
        essence: EssenceField,
        timeline: Timeline,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let manager = SaveManager::new(dir.path());
        Fixture {
            manager,
            world: World::new(),
            density: DensityField::new(),
            essence: EssenceField::new(),
            timeline: Timeline::new(),
            _dir: dir,
        }
    }

    #[test]
    fn test_save_load_roundtrip() {
        let mut fx = fixture();
        let entity = fx.world.create_scene_entity(Some("hero"));
        fx.world.set(entity, Position { x: 1.0, y: 2.0, z: 3.0 });
        fx.density.write(0, 0, 0, 0.9);

        fx.manager
            .save(
                "slot_a",
                &fx.world,
                &fx.density,
                &fx.essence,
                &fx.timeline,
                Some(Vec3::new(5.0, 6.0, 7.0)),
                None,
            )
            .unwrap();

        let mut world = World::new();
        let mut density = DensityField::new();
        let mut essence = EssenceField::new();
        let timeline = Timeline::new();
        let player = fx
            .manager
            .load("slot_a", &mut world, &mut density, &mut essence, &timeline)
            .unwrap();

        let hero = world.find_by_name("hero").unwrap();
        assert_eq!(world.get::<Position>(hero).unwrap().x, 1.0);
        assert_eq!(density.read(0, 0, 0), 0.9);
        assert_eq!(player.position, Some(Vec3::new(5.0, 6.0, 7.0)));
        assert_eq!(player.velocity, None);
    }

    #[test]
    fn test_save_resumes_running_timeline() {
        let fx = fixture();
        assert!(!fx.timeline.is_paused());
        fx.manager
            .save("t", &fx.world, &fx.density, &fx.essence, &fx.timeline, None, None)
            .unwrap();
        assert!(!fx.timeline.is_paused());

        fx.timeline.pause();
        fx.manager
            .save("t", &fx.world, &fx.density, &fx.essence, &fx.timeline, None, None)
            .unwrap();
        assert!(fx.timeline.is_paused(), "paused timeline stays paused");
    }

    #[test]
    fn test_load_rejects_version_mismatch() {
        let fx = fixture();
        let path = fx.manager.slot_path("old");
        fs::write(
            &path,
            r#"{"save_version":"0.9","slot":"old","timestamp":"","scene":{"version":"1.0"}}"#,
        )
        .unwrap();

        let mut world = World::new();
        let mut density = DensityField::new();
        let mut essence = EssenceField::new();
        let timeline = Timeline::new();
        let err = fx
            .manager
            .load("old", &mut world, &mut density, &mut essence, &timeline)
            .unwrap_err();
        assert!(matches!(err, FabricError::InvalidState(_)));
    }

    #[test]
    fn test_load_missing_slot_is_not_found() {
        let fx = fixture();
        let mut world = World::new();
        let mut density = DensityField::new();
        let mut essence = EssenceField::new();
        let timeline = Timeline::new();
        let err = fx
            .manager
            .load("ghost", &mut world, &mut density, &mut essence, &timeline)
            .unwrap_err();
        assert!(matches!(err, FabricError::NotFound(_)));
    }

    #[test]
    fn test_autosave_rotates_between_two_slots() {
        let mut fx = fixture();
        fx.manager.enable_autosave(1.0);

        // First interval: autosave_0
        assert!(!fx.manager.tick_autosave(
            0.5,
            &fx.world,
            &fx.density,
            &fx.essence,
            &fx.timeline,
            None,
            None
        ));
        assert!(fx.manager.tick_autosave(
            0.5,
            &fx.world,
            &fx.density,
            &fx.essence,
            &fx.timeline,
            None,
            None
        ));

        // Second and third intervals: autosave_1 then back to autosave_0
        assert!(fx.manager.tick_autosave(
            1.0,
            &fx.world,
            &fx.density,
            &fx.essence,
            &fx.timeline,
            None,
            None
        ));
        assert!(fx.manager.tick_autosave(
            1.0,
            &fx.world,
            &fx.density,
            &fx.essence,
            &fx.timeline,
            None,
            None
        ));

        let names: Vec<String> = fx.manager.list_slots().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["autosave_0", "autosave_1"]);
    }

    #[test]
    fn test_list_slots_reads_envelope_metadata() {
        let fx = fixture();
        fx.manager
            .save("alpha", &fx.world, &fx.density, &fx.essence, &fx.timeline, None, None)
            .unwrap();

        let slots = fx.manager.list_slots();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].name, "alpha");
        assert_eq!(slots[0].version, SAVE_VERSION);
        assert!(slots[0].timestamp.ends_with('Z'));
        assert!(slots[0].size_bytes > 0);
    }

    #[test]
    fn test_delete_slot() {
        let fx = fixture();
        fx.manager
            .save("doomed", &fx.world, &fx.density, &fx.essence, &fx.timeline, None, None)
            .unwrap();
        assert!(fx.manager.delete_slot("doomed"));
        assert!(!fx.manager.delete_slot("doomed"));
        assert!(fx.manager.list_slots().is_empty());
    }
}

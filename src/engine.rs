//! Top-level runtime: owns every subsystem and ticks them in a fixed order
//! each frame: mode -> streaming -> interaction (caller-driven) -> simulation
//! -> AI -> ECS progress -> meshing -> timeline -> autosave.

use crate::ai::behavior::BehaviorAi;
use crate::animation::system::register_animation_system;
use crate::config::EngineConfig;
use crate::core::app_mode::{AppMode, AppModeManager};
use crate::core::event::EventDispatcher;
use crate::core::input_recorder::InputRecorder;
use crate::core::temporal::Timeline;
use crate::ecs::World;
use crate::player::movement::MovementFSM;
use crate::rendering::mesh_manager::ChunkMeshManager;
use crate::save::manager::SaveManager;
use crate::utils::error::Result;
use crate::world::interaction;
use crate::world::chunk_coord::ChunkCoord;
use crate::world::raycast::{cast_ray, VoxelHit};
use crate::world::simulation::SimulationHarness;
use crate::world::streaming::{ChunkStreamingManager, StreamingUpdate};
use glam::{Vec3, Vec4};
use log::debug;
use std::sync::Arc;

/// Per-tick summary for callers that want to inspect what happened.
#[derive(Debug, Default, Clone)]
pub struct TickReport {
    pub chunks_loaded: usize,
    pub chunks_unloaded: usize,
    pub chunks_remeshed: usize,
    pub autosaved: bool,
}

pub struct Engine {
    pub config: EngineConfig,
    pub dispatcher: Arc<EventDispatcher>,
    pub simulation: SimulationHarness,
    pub streaming: ChunkStreamingManager,
    pub mesh_manager: ChunkMeshManager,
    pub world: World,
    pub behavior_ai: BehaviorAi,
    pub movement: MovementFSM,
    pub timeline: Arc<Timeline>,
    pub save_manager: SaveManager,
    pub input_recorder: InputRecorder,
    pub mode_manager: AppModeManager,

    player_position: Vec3,
    player_velocity: Vec3,
    frame_counter: u64,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let dispatcher = Arc::new(EventDispatcher::new());
        let mesh_manager = ChunkMeshManager::new(&dispatcher, config.meshing.clone());
        let streaming = ChunkStreamingManager::new(config.streaming.clone());
        let save_manager = SaveManager::new(&config.saving.save_directory);

        let mut world = World::new();
        register_animation_system(&mut world);

        let mut engine = Self {
            dispatcher,
            simulation: SimulationHarness::new(),
            streaming,
            mesh_manager,
            world,
            behavior_ai: BehaviorAi::new(),
            movement: MovementFSM::new(),
            timeline: Arc::new(Timeline::new()),
            save_manager,
            input_recorder: InputRecorder::new(),
            mode_manager: AppModeManager::new(),
            player_position: Vec3::ZERO,
            player_velocity: Vec3::ZERO,
            config,
            frame_counter: 0,
        };

        if engine.config.saving.autosave_enabled {
            let interval = engine.config.saving.autosave_interval;
            engine.save_manager.enable_autosave(interval);
        }
        engine
    }

    pub fn player_position(&self) -> Vec3 {
        self.player_position
    }

    pub fn set_player_position(&mut self, position: Vec3) {
        self.player_position = position;
    }

    pub fn player_velocity(&self) -> Vec3 {
        self.player_velocity
    }

    pub fn set_player_velocity(&mut self, velocity: Vec3) {
        self.player_velocity = velocity;
    }

    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// Raycast from the viewer through the density field.
    pub fn pick(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<VoxelHit> {
        cast_ray(
            self.simulation.density().grid(),
            origin,
            direction,
            self.config.meshing.density_threshold,
            max_distance,
        )
    }

    /// Place matter against the first hit face along the ray.
    pub fn place_matter(
        &mut self,
        origin: Vec3,
        direction: Vec3,
        value: f32,
        color: Vec4,
        max_distance: f32,
    ) -> interaction::InteractionResult {
        let threshold = self.config.meshing.density_threshold;
        let (density, essence) = self.simulation.fields_mut();
        interaction::create_matter_at(
            density,
            essence,
            &self.dispatcher,
            origin,
            direction,
            value,
            color,
            threshold,
            max_distance,
        )
    }

    /// Destroy the first solid voxel along the ray.
    pub fn break_matter(
        &mut self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    ) -> interaction::InteractionResult {
        let threshold = self.config.meshing.density_threshold;
        let (density, _) = self.simulation.fields_mut();
        interaction::destroy_matter_at(
            density,
            &self.dispatcher,
            origin,
            direction,
            threshold,
            max_distance,
        )
    }

    /// Advance one frame. Interaction happens between frames through
    /// `place_matter` / `break_matter`; everything else runs here in order.
    pub fn tick(&mut self, dt: f32) -> TickReport {
        self.frame_counter += 1;
        let mut report = TickReport::default();

        let paused = AppModeManager::flags(self.mode_manager.current()).pause_simulation;

        // Streaming follows the viewer regardless of pause
        let speed = self.player_velocity.length();
        let update = self.streaming.update(
            self.player_position.x,
            self.player_position.y,
            self.player_position.z,
            speed,
        );
        self.apply_streaming(&update, &mut report);

        if !paused {
            self.simulation.tick(dt as f64);

            self.behavior_ai.update(&mut self.world, dt);
            self.world.progress(dt);
        }

        report.chunks_remeshed = self.mesh_manager.update(
            self.simulation.density().grid(),
            self.simulation.essence().grid(),
        );

        self.timeline.update(dt as f64);

        report.autosaved = self.save_manager.tick_autosave(
            dt,
            &self.world,
            self.simulation.density(),
            self.simulation.essence(),
            &self.timeline,
            Some(self.player_position),
            Some(self.player_velocity),
        );

        debug!(
            "frame {}: +{} chunks, -{} chunks, {} remeshed",
            self.frame_counter, report.chunks_loaded, report.chunks_unloaded, report.chunks_remeshed
        );
        report
    }

    fn apply_streaming(&mut self, update: &StreamingUpdate, report: &mut TickReport) {
        // Loaded chunks become mesh candidates; actual terrain content comes
        // from generators or saves writing into the fields
        for coord in &update.to_load {
            self.mesh_manager.mark_dirty(coord.x, coord.y, coord.z);
        }
        for coord in &update.to_unload {
            self.unload_chunk(coord);
        }
        report.chunks_loaded = update.to_load.len();
        report.chunks_unloaded = update.to_unload.len();
    }

    fn unload_chunk(&mut self, coord: &ChunkCoord) {
        self.mesh_manager.remove_chunk(coord);
        self.simulation.density_mut().grid_mut().remove_chunk(coord);
        self.simulation.essence_mut().grid_mut().remove_chunk(coord);
    }

    /// Save the full runtime state into a named slot.
    pub fn save(&self, slot: &str) -> Result<()> {
        self.save_manager.save(
            slot,
            &self.world,
            self.simulation.density(),
            self.simulation.essence(),
            &self.timeline,
            Some(self.player_position),
            Some(self.player_velocity),
        )
    }

    /// Restore a named slot, replacing player state when the save carries it.
    pub fn load(&mut self, slot: &str) -> Result<()> {
        let (density, essence) = self.simulation.fields_mut();
        let player = self.save_manager.load(slot, &mut self.world, density, essence, &self.timeline)?;
        if let Some(position) = player.position {
            self.player_position = position;
        }
        if let Some(velocity) = player.velocity {
            self.player_velocity = velocity;
        }
        Ok(())
    }

    pub fn set_mode(&mut self, mode: AppMode) -> bool {
        self.mode_manager.transition(mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StreamingConfig;

    fn test_config() -> EngineConfig {
        let dir = tempfile::tempdir().unwrap();
        let mut config = EngineConfig::default();
        config.saving.save_directory = dir.into_path();
        config.streaming = StreamingConfig {
            base_radius: 1,
            max_radius: 2,
            speed_scale: 0.5,
            max_loads_per_tick: 1000,
            max_unloads_per_tick: 1000,
        };
        config.meshing.max_remesh_per_tick = 1000;
        config
    }

    #[test]
    fn test_edit_then_tick_remeshes_target_chunk() {
        let mut engine = Engine::new(test_config());
        engine
            .simulation
            .density_mut()
            .write(0, 0, 0, 1.0);

        // Single solid voxel at (5,5,5); place against its near face
        engine.simulation.density_mut().write(5, 5, 5, 1.0);
        let result = engine.place_matter(
            Vec3::new(5.5, 5.5, 0.5),
            Vec3::new(0.0, 0.0, 1.0),
            1.0,
            Vec4::new(0.5, 0.5, 0.5, 1.0),
            10.0,
        );
        assert!(result.success);
        assert_eq!((result.x, result.y, result.z), (5, 5, 4));
        assert_eq!((result.cx, result.cy, result.cz), (0, 0, 0));

        engine.tick(0.016);
        assert_eq!(engine.mesh_manager.dirty_count(), 0);
        let mesh = engine
            .mesh_manager
            .mesh_for(&ChunkCoord::new(0, 0, 0))
            .expect("remeshed chunk");
        assert!(!mesh.is_empty());
    }

    #[test]
    fn test_break_matter_clears_voxel() {
        let mut engine = Engine::new(test_config());
        engine.simulation.density_mut().write(3, 0, 0, 1.0);

        let result = engine.break_matter(Vec3::new(0.5, 0.5, 0.5), Vec3::X, 10.0);
        assert!(result.success);
        assert_eq!(engine.simulation.density().read(3, 0, 0), 0.0);
    }

    #[test]
    fn test_paused_mode_freezes_simulation() {
        let mut engine = Engine::new(test_config());
        engine.simulation.density_mut().write(0, 0, 0, 1.0);
        engine
            .simulation
            .register_rule("decay", |density, _essence, x, y, z, dt| {
                let v = density.read(x, y, z);
                if v > 0.0 {
                    density.write(x, y, z, v - dt as f32);
                }
            });

        engine.set_mode(AppMode::Paused);
        engine.tick(0.5);
        assert_eq!(engine.simulation.density().read(0, 0, 0), 1.0);

        engine.set_mode(AppMode::Game);
        engine.tick(0.5);
        assert!(engine.simulation.density().read(0, 0, 0) < 1.0);
    }

    #[test]
    fn test_streaming_unload_drops_field_and_mesh_state() {
        let mut engine = Engine::new(test_config());
        engine.simulation.density_mut().write(0, 0, 0, 1.0);
        engine.tick(0.016);
        assert!(engine.mesh_manager.mesh_count() > 0);

        // Teleport far away: chunk (0,0,0) unloads everywhere
        engine.set_player_position(Vec3::new(10_000.0, 0.0, 0.0));
        engine.tick(0.016);
        assert!(engine
            .mesh_manager
            .mesh_for(&ChunkCoord::new(0, 0, 0))
            .is_none());
        assert_eq!(engine.simulation.density().read(0, 0, 0), 0.0);
    }

    #[test]
    fn test_save_load_through_engine() {
        let mut engine = Engine::new(test_config());
        engine.simulation.density_mut().write(1, 1, 1, 0.8);
        engine.set_player_position(Vec3::new(4.0, 5.0, 6.0));
        engine.save("checkpoint").unwrap();

        engine.simulation.density_mut().write(1, 1, 1, 0.0);
        engine.set_player_position(Vec3::ZERO);
        engine.load("checkpoint").unwrap();

        assert_eq!(engine.simulation.density().read(1, 1, 1), 0.8);
        assert_eq!(engine.player_position(), Vec3::new(4.0, 5.0, 6.0));
        assert!(!engine.timeline.is_paused(), "running timeline stays running across the cycle");
    }

    #[test]
    fn test_timeline_advances_per_tick() {
        let mut engine = Engine::new(test_config());
        engine.tick(0.25);
        engine.tick(0.25);
        assert!((engine.timeline.current_time() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_animation_runs_in_frame_loop() {
        use crate::animation::sampler::test_fixtures::{chain_skeleton, slide_clip};
        use crate::animation::system::{AnimationState, SkeletonComponent, SkinningData};

        let mut engine = Engine::new(test_config());
        let skeleton = Arc::new(chain_skeleton());
        let clip = Arc::new(slide_clip(&skeleton));

        let entity = engine.world.create_entity();
        engine.world.set(
            entity,
            SkeletonComponent {
                skeleton: Arc::clone(&skeleton),
            },
        );
        engine.world.set(entity, AnimationState::new(clip));
        engine.world.set(entity, SkinningData::default());

        engine.tick(0.25);
        let state = engine.world.get::<AnimationState>(entity).unwrap();
        assert!((state.time - 0.25).abs() < 1e-5);
        let skinning = engine.world.get::<SkinningData>(entity).unwrap();
        assert_eq!(skinning.joint_matrices.len(), 3);

        // Paused mode freezes the ECS pass, animation included
        engine.set_mode(AppMode::Paused);
        engine.tick(0.25);
        let state = engine.world.get::<AnimationState>(entity).unwrap();
        assert!((state.time - 0.25).abs() < 1e-5);
    }
}

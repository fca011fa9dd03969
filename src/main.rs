use anyhow::{Context, Result};
use fabric::animation::{
    AnimationClip, AnimationState, JointTrack, Skeleton, SkeletonComponent, SkinningData,
};
use fabric::config::EngineConfig;
use fabric::engine::Engine;
use fabric::prelude::{Vec3, Vec4};
use fabric::utils::math::Transform;
use log::{info, LevelFilter};
use rand::Rng;
use simple_logger::SimpleLogger;
use std::path::Path;
use std::sync::Arc;

/// Headless sandbox: carve a small island of matter, run the frame loop for
/// a few seconds of simulated time while editing terrain, then write a save
/// slot and report what happened.
fn main() -> Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .context("failed to initialize logger")?;

    let config_path = Path::new("fabric.toml");
    let mut config = if config_path.exists() {
        EngineConfig::from_file(config_path).context("failed to load fabric.toml")?
    } else {
        EngineConfig::default()
    };
    config.saving.save_directory = std::env::temp_dir().join("fabric-sandbox/saves");

    let mut engine = Engine::new(config);
    info!("fabric {} sandbox starting", fabric::VERSION);

    // Seed a 24x4x24 slab with scattered essence colors
    let mut rng = rand::thread_rng();
    for x in 0..24 {
        for y in 0..4 {
            for z in 0..24 {
                let (density, essence) = engine.simulation.fields_mut();
                density.write(x, y, z, 1.0);
                essence.write(
                    x,
                    y,
                    z,
                    Vec4::new(
                        0.2 + rng.gen::<f32>() * 0.2,
                        0.5 + rng.gen::<f32>() * 0.3,
                        0.2,
                        1.0,
                    ),
                );
            }
        }
    }
    engine.mesh_manager.mark_dirty(0, 0, 0);

    // Erosion rule: surface matter decays slowly
    engine
        .simulation
        .register_rule("erode", |density, _essence, x, y, z, dt| {
            let v = density.read(x, y, z);
            if v > 0.0 && density.grid().neighbors(x, y, z).pos_y < 0.5 {
                density.write(x, y, z, (v - 0.01 * dt as f32).max(0.0));
            }
        });

    // A two-joint bobbing marker so the animation pass has work each frame
    let skeleton = Arc::new(
        Skeleton::new(
            vec!["base".into(), "tip".into()],
            vec![-1, 0],
            vec![
                Transform::IDENTITY,
                Transform {
                    position: Vec3::Y,
                    ..Transform::IDENTITY
                },
            ],
        )
        .expect("two-joint chain is well formed"),
    );
    let bob = AnimationClip::new(
        "bob",
        2.0,
        vec![
            JointTrack {
                times: vec![0.0, 1.0, 2.0],
                values: vec![
                    Transform::IDENTITY,
                    Transform {
                        position: Vec3::Y * 0.5,
                        ..Transform::IDENTITY
                    },
                    Transform::IDENTITY,
                ],
            },
            JointTrack::constant(Transform {
                position: Vec3::Y,
                ..Transform::IDENTITY
            }),
        ],
    );
    let marker = engine.world.create_scene_entity(Some("trench_marker"));
    engine.world.set(
        marker,
        SkeletonComponent {
            skeleton: Arc::clone(&skeleton),
        },
    );
    engine
        .world
        .set(marker, AnimationState::new(Arc::new(bob)));
    engine.world.set(marker, SkinningData::default());

    engine.set_player_position(Vec3::new(12.0, 8.0, 12.0));
    engine.save_manager.enable_autosave(2.0);

    let dt = 1.0 / 60.0;
    for frame in 0..600u32 {
        // Dig a trench across the slab, one bite every quarter second
        if frame % 15 == 0 {
            let x = (frame / 15) as f32;
            engine.break_matter(
                Vec3::new(x + 0.5, 8.0, 12.5),
                Vec3::new(0.0, -1.0, 0.0),
                16.0,
            );
        }
        let report = engine.tick(dt);
        if report.autosaved {
            info!("autosave fired on frame {}", frame);
        }
    }

    engine.save("sandbox_exit").context("final save failed")?;

    let joints = engine
        .world
        .get::<SkinningData>(marker)
        .map_or(0, |s| s.joint_matrices.len());
    info!(
        "done: {} frames, {} meshes resident, {} active chunks, {} skinned joints, t={:.2}s",
        engine.frame_counter(),
        engine.mesh_manager.mesh_count(),
        engine.simulation.density().grid().active_chunk_count(),
        joints,
        engine.timeline.current_time(),
    );
    for slot in engine.save_manager.list_slots() {
        info!("slot '{}' ({} bytes) saved at {}", slot.name, slot.size_bytes, slot.timestamp);
    }

    Ok(())
}

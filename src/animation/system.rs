//! ECS animation system: advances playback state, samples the clip, and
//! writes skinning matrices for the renderer.

use crate::animation::sampler::{AnimationClip, AnimationSampler, Skeleton};
use crate::ecs::World;
use glam::Mat4;
use std::sync::Arc;

/// Shared skeleton reference component.
#[derive(Clone)]
pub struct SkeletonComponent {
    pub skeleton: Arc<Skeleton>,
}

/// Playback state for one clip on one entity.
#[derive(Clone)]
pub struct AnimationState {
    pub clip: Arc<AnimationClip>,
    pub time: f32,
    pub speed: f32,
    pub looping: bool,
    pub playing: bool,
}

impl AnimationState {
    pub fn new(clip: Arc<AnimationClip>) -> Self {
        Self {
            clip,
            time: 0.0,
            speed: 1.0,
            looping: true,
            playing: true,
        }
    }
}

/// Final joint matrices for GPU upload.
#[derive(Debug, Clone, Default)]
pub struct SkinningData {
    pub joint_matrices: Vec<[f32; 16]>,
}

/// Register the per-tick animation pass: for every playing entity, advance
/// time (wrapping when looped, clamping and stopping otherwise), sample at
/// `time / duration`, compose, and write skinning matrices.
pub fn register_animation_system(world: &mut World) {
    world.add_system("animation", |world, dt| {
        for entity in world.entities_with3::<SkeletonComponent, AnimationState, SkinningData>() {
            let Some(skeleton) = world
                .get::<SkeletonComponent>(entity)
                .map(|c| Arc::clone(&c.skeleton))
            else {
                continue;
            };

            let Some(state) = world.get_mut::<AnimationState>(entity) else {
                continue;
            };
            if !state.playing {
                continue;
            }

            let duration = state.clip.duration;
            if duration > 0.0 {
                state.time += dt * state.speed;
                if state.looping {
                    state.time = state.time.rem_euclid(duration);
                } else if state.time >= duration {
                    state.time = duration;
                    state.playing = false;
                } else if state.time < 0.0 {
                    state.time = 0.0;
                    state.playing = false;
                }
            }

            let ratio = if duration > 0.0 {
                state.time / duration
            } else {
                0.0
            };
            let clip = Arc::clone(&state.clip);

            let mut locals = Vec::new();
            AnimationSampler::sample(&clip, &skeleton, ratio, &mut locals);
            let mut models: Vec<Mat4> = Vec::new();
            AnimationSampler::local_to_model(&skeleton, &locals, &mut models);
            let matrices = AnimationSampler::compute_skinning_matrices(&skeleton, &models);

            if let Some(skinning) = world.get_mut::<SkinningData>(entity) {
                skinning.joint_matrices = matrices
                    .into_iter()
                    .map(|m| m.to_cols_array())
                    .collect();
            }
        }
    });
}

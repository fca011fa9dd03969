//! Skinned-pose pipeline: keyframe sampling into SoA-packed local
//! transforms, weighted pose blending with a rest-pose fallback, hierarchy
//! composition to model space, and skinning matrix computation.

use crate::utils::error::{FabricError, Result};
use crate::utils::math::Transform;
use glam::{Mat4, Quat, Vec3};

/// Joints per SoA lane element.
pub const SOA_LANES: usize = 4;

/// Four joints packed per element; locals buffers are sized
/// `ceil(joint_count / 4)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoaTransform {
    pub joints: [Transform; SOA_LANES],
}

impl Default for SoaTransform {
    fn default() -> Self {
        Self {
            joints: [Transform::IDENTITY; SOA_LANES],
        }
    }
}

/// Joint hierarchy with rest pose. Parents must precede children so model
/// composition is a single forward pass.
#[derive(Debug)]
pub struct Skeleton {
    joint_names: Vec<String>,
    parents: Vec<i32>,
    rest_locals: Vec<Transform>,
}

impl Skeleton {
    pub fn new(
        joint_names: Vec<String>,
        parents: Vec<i32>,
        rest_locals: Vec<Transform>,
    ) -> Result<Self> {
        if joint_names.len() != parents.len() || parents.len() != rest_locals.len() {
            return Err(FabricError::InvalidState(
                "skeleton arrays must have equal length".into(),
            ));
        }
        for (joint, &parent) in parents.iter().enumerate() {
            if parent >= joint as i32 {
                return Err(FabricError::InvalidState(format!(
                    "joint {} has parent {}; parents must precede children",
                    joint, parent
                )));
            }
        }
        Ok(Self {
            joint_names,
            parents,
            rest_locals,
        })
    }

    pub fn num_joints(&self) -> usize {
        self.parents.len()
    }

    pub fn num_soa_joints(&self) -> usize {
        (self.num_joints() + SOA_LANES - 1) / SOA_LANES
    }

    pub fn joint_name(&self, joint: usize) -> Option<&str> {
        self.joint_names.get(joint).map(String::as_str)
    }

    pub fn parent(&self, joint: usize) -> Option<i32> {
        self.parents.get(joint).copied()
    }

    pub fn rest_local(&self, joint: usize) -> Transform {
        self.rest_locals
            .get(joint)
            .copied()
            .unwrap_or(Transform::IDENTITY)
    }

    /// Rest pose packed into SoA lanes, padded with identity.
    pub fn rest_locals_soa(&self) -> Vec<SoaTransform> {
        let mut locals = vec![SoaTransform::default(); self.num_soa_joints()];
        for (joint, rest) in self.rest_locals.iter().enumerate() {
            locals[joint / SOA_LANES].joints[joint % SOA_LANES] = *rest;
        }
        locals
    }
}

/// Keyframe track for one joint; times are clip-local seconds.
#[derive(Debug, Clone, Default)]
pub struct JointTrack {
    pub times: Vec<f32>,
    pub values: Vec<Transform>,
}

impl JointTrack {
    pub fn constant(value: Transform) -> Self {
        Self {
            times: vec![0.0],
            values: vec![value],
        }
    }

    /// Linear sample with endpoint clamping; rotation is slerped.
    pub fn sample(&self, time: f32) -> Option<Transform> {
        if self.times.is_empty() {
            return None;
        }
        let next = self.times.partition_point(|&t| t <= time);
        if next == 0 {
            return Some(self.values[0]);
        }
        if next >= self.times.len() {
            return Some(self.values[self.times.len() - 1]);
        }

        let prev = next - 1;
        let t0 = self.times[prev];
        let t1 = self.times[next];
        let span = t1 - t0;
        let alpha = if span > 1e-6 {
            ((time - t0) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let a = self.values[prev];
        let b = self.values[next];
        Some(Transform {
            position: a.position.lerp(b.position, alpha),
            rotation: a.rotation.slerp(b.rotation, alpha).normalize(),
            scale: a.scale.lerp(b.scale, alpha),
        })
    }
}

/// One track per joint; joints without a track sample at rest.
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub tracks: Vec<JointTrack>,
}

impl AnimationClip {
    pub fn new(name: &str, duration: f32, tracks: Vec<JointTrack>) -> Self {
        Self {
            name: name.to_string(),
            duration,
            tracks,
        }
    }
}

pub struct AnimationSampler;

impl AnimationSampler {
    /// Sample a clip at time ratio `r` in [0,1] into a SoA locals buffer of
    /// `num_soa_joints` elements.
    pub fn sample(
        clip: &AnimationClip,
        skeleton: &Skeleton,
        ratio: f32,
        locals: &mut Vec<SoaTransform>,
    ) {
        let time = ratio.clamp(0.0, 1.0) * clip.duration;
        locals.clear();
        locals.resize(skeleton.num_soa_joints(), SoaTransform::default());

        for joint in 0..skeleton.num_joints() {
            let sampled = clip
                .tracks
                .get(joint)
                .and_then(|track| track.sample(time))
                .unwrap_or_else(|| skeleton.rest_local(joint));
            locals[joint / SOA_LANES].joints[joint % SOA_LANES] = sampled;
        }
    }

    /// Normalized two-pose blend with weights `(1-w, w)`. When the combined
    /// weight falls under the 0.1 threshold, the skeleton's rest pose fills
    /// the remainder.
    pub fn blend(
        skeleton: &Skeleton,
        a: &[SoaTransform],
        b: &[SoaTransform],
        weight: f32,
        output: &mut Vec<SoaTransform>,
    ) {
        const THRESHOLD: f32 = 0.1;

        let w_b = weight.clamp(0.0, 1.0);
        let w_a = 1.0 - w_b;
        let total = w_a + w_b;
        let rest_w = (THRESHOLD - total).max(0.0);
        let denom = total + rest_w;

        output.clear();
        output.resize(skeleton.num_soa_joints(), SoaTransform::default());

        for joint in 0..skeleton.num_joints() {
            let lane = joint / SOA_LANES;
            let slot = joint % SOA_LANES;
            let pa = a.get(lane).map_or(Transform::IDENTITY, |l| l.joints[slot]);
            let pb = b.get(lane).map_or(Transform::IDENTITY, |l| l.joints[slot]);
            let rest = skeleton.rest_local(joint);

            let position =
                (pa.position * w_a + pb.position * w_b + rest.position * rest_w) / denom;
            let scale = (pa.scale * w_a + pb.scale * w_b + rest.scale * rest_w) / denom;

            // Weighted nlerp with hemisphere correction against the first pose
            let mut rotation = pa.rotation * w_a;
            let rb = if pa.rotation.dot(pb.rotation) < 0.0 {
                -pb.rotation
            } else {
                pb.rotation
            };
            rotation = Quat::from_xyzw(
                rotation.x + rb.x * w_b,
                rotation.y + rb.y * w_b,
                rotation.z + rb.z * w_b,
                rotation.w + rb.w * w_b,
            );
            if rest_w > 0.0 {
                let rr = if pa.rotation.dot(rest.rotation) < 0.0 {
                    -rest.rotation
                } else {
                    rest.rotation
                };
                rotation = Quat::from_xyzw(
                    rotation.x + rr.x * rest_w,
                    rotation.y + rr.y * rest_w,
                    rotation.z + rr.z * rest_w,
                    rotation.w + rr.w * rest_w,
                );
            }

            output[lane].joints[slot] = Transform {
                position,
                rotation: rotation.normalize(),
                scale,
            };
        }
    }

    /// Compose SoA locals into model-space matrices through the hierarchy.
    pub fn local_to_model(skeleton: &Skeleton, locals: &[SoaTransform], models: &mut Vec<Mat4>) {
        let n = skeleton.num_joints();
        models.clear();
        models.resize(n, Mat4::IDENTITY);

        for joint in 0..n {
            let local = locals
                .get(joint / SOA_LANES)
                .map_or(Transform::IDENTITY, |l| l.joints[joint % SOA_LANES])
                .matrix();
            models[joint] = match skeleton.parent(joint) {
                Some(parent) if parent >= 0 => models[parent as usize] * local,
                _ => local,
            };
        }
    }

    /// `models[i] * inverse(rest_models[i])` for every joint; identity at the
    /// rest pose.
    pub fn compute_skinning_matrices(skeleton: &Skeleton, models: &[Mat4]) -> Vec<Mat4> {
        let rest_soa = skeleton.rest_locals_soa();
        let mut rest_models = Vec::new();
        Self::local_to_model(skeleton, &rest_soa, &mut rest_models);

        models
            .iter()
            .zip(rest_models.iter())
            .map(|(model, rest)| *model * rest.inverse())
            .collect()
    }
}

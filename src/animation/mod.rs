pub mod events;
pub mod sampler;
pub mod system;

pub use events::{AnimEventData, AnimEventMarker, AnimEventType, AnimationEvents, ClipId};
pub use sampler::{AnimationClip, AnimationSampler, JointTrack, Skeleton, SoaTransform};
pub use system::{register_animation_system, AnimationState, SkeletonComponent, SkinningData};

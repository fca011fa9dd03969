//! Voxel world runtime core library

// Core systems
pub mod ai;
pub mod animation;
pub mod config;
pub mod core;
pub mod ecs;
pub mod engine;
pub mod player;
pub mod rendering;
pub mod save;
pub mod utils;
pub mod world;

/// Engine prelude
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::core::event::{Event, EventDispatcher};
    pub use crate::core::temporal::Timeline;
    pub use crate::ecs::World;
    pub use crate::engine::Engine;
    pub use crate::utils::error::{FabricError, Result};
    pub use crate::world::chunk_coord::{ChunkCoord, CHUNK_SIZE};
    pub use crate::world::grid::{ChunkedGrid, DensityField, EssenceField};

    // Commonly used external types
    pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
    pub use parking_lot::{Mutex, RwLock};
}

/// Current engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

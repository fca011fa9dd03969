pub mod manager;
pub mod serializer;

pub use manager::{SaveManager, SlotInfo};
pub use serializer::{LoadedPlayer, SceneSerializer, SCENE_VERSION};

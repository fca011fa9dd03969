pub mod character;
pub mod engine;
pub mod meshing;
pub mod saving;
pub mod streaming;

pub use character::CharacterConfig;
pub use engine::EngineConfig;
pub use meshing::MeshConfig;
pub use saving::SaveConfig;
pub use streaming::StreamingConfig;

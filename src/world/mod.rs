pub mod chunk_coord;
pub mod grid;
pub mod interaction;
pub mod palette;
pub mod raycast;
pub mod simulation;
pub mod streaming;

pub use chunk_coord::{ChunkCoord, CHUNK_SHIFT, CHUNK_SIZE, CHUNK_VOLUME};
pub use grid::{ChunkedGrid, DensityField, EssenceField, FieldLayer};
pub use palette::EssencePalette;

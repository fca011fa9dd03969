pub mod camera;
pub mod interpolation;
pub mod mesh;
pub mod mesh_manager;
pub mod mesher;
pub mod scene_view;

pub use camera::Camera;
pub use mesh::{ChunkMeshData, MeshVertex};
pub use mesh_manager::{ChunkMeshManager, MeshPool, VOXEL_CHANGED_EVENT};
pub use scene_view::{DrawCall, FrustumCuller, RenderList, Renderer, SceneView};

pub mod camera;
pub mod mesh;
pub mod model;
pub mod texture;

pub use camera::{Camera, CameraConfig, CameraMovement, MouseLook};
pub use mesh::{Mesh, MeshData, MeshError};
pub use model::{LoadError, Model};
pub use texture::{Texture, TextureCache, TextureError, TextureKind};

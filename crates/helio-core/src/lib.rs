pub mod bounds;
pub mod camera;
pub mod error;
pub mod light;
pub mod material;
pub mod mesh;
pub mod scene;
pub mod texture;
pub mod transform;

pub use bounds::{Aabb, Sphere};
pub use camera::{Camera, Projection};
pub use error::{HelioError, Result};
pub use light::{Light, LightId, LightKind, ShadowMap, ShadowUpdateMode};
pub use material::{BakePass, CullMode, Material, MaterialRef, ShaderChunk, ShaderDefine};
pub use mesh::{LightMask, Mesh, MeshInstance, MeshInstanceId, MeshRef, ShaderDefs, VertexFormat};
pub use scene::{
    AssetId, ComponentKind, Fog, FogMode, GammaCorrection, LightingSettings, LightmapArea,
    LightmapSettings, NodeId, RenderComponent, Scene, SceneNode,
};
pub use texture::{
    downcast_texture, AddressMode, AsAny, FilterMode, RenderTarget, ResourceId, Texture,
    TextureDesc, TextureEncoding, TextureFormat, TextureRef,
};
pub use transform::{rotation_from_euler_degrees, Transform};

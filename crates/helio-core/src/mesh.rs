use std::sync::Arc;

use bitflags::bitflags;
use glam::Vec3;

use crate::bounds::Aabb;
use crate::material::{BakePass, MaterialRef};
use crate::scene::NodeId;
use crate::texture::{ResourceId, TextureRef};

bitflags! {
    /// Which lights affect a mesh instance, and which mesh instances a light affects.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LightMask: u32 {
        const AFFECT_DYNAMIC = 1 << 0;
        const AFFECT_LIGHTMAPPED = 1 << 1;
        const BAKE = 1 << 2;
        const EVERYTHING = u32::MAX;
    }
}

bitflags! {
    /// Shader variant switches driven by lightmap state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderDefs: u32 {
        const LIGHTMAP = 1 << 0;
        const DIR_LIGHTMAP = 1 << 1;
        const LIGHTMAP_AMBIENT = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexFormat {
    pub has_normal: bool,
    pub has_uv0: bool,
    pub has_uv1: bool,
}

impl Default for VertexFormat {
    fn default() -> Self {
        Self {
            has_normal: true,
            has_uv0: true,
            has_uv1: true,
        }
    }
}

/// Geometry shared between mesh instances. Identity is the vertex buffer, so
/// two instances share geometry exactly when they hold the same `Mesh`.
#[derive(Debug)]
pub struct Mesh {
    id: ResourceId,
    pub name: String,
    pub vertex_format: VertexFormat,
    /// Object-space bounds
    pub aabb: Aabb,
    pub skinned: bool,
}

pub type MeshRef = Arc<Mesh>;

impl Mesh {
    pub fn new(name: impl Into<String>, vertex_format: VertexFormat, aabb: Aabb) -> Self {
        Self {
            id: ResourceId::new(),
            name: name.into(),
            vertex_format,
            aabb,
            skinned: false,
        }
    }

    /// Axis-aligned box with both UV sets
    pub fn cube(name: impl Into<String>, half_extent: f32) -> MeshRef {
        Arc::new(Self::new(
            name,
            VertexFormat::default(),
            Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(half_extent)),
        ))
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn has_uv1(&self) -> bool {
        self.vertex_format.has_uv1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshInstanceId(pub(crate) usize);

impl MeshInstanceId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct MeshInstance {
    pub node: NodeId,
    pub mesh: MeshRef,
    pub material: MaterialRef,
    /// World-space bounds, refreshed by `Scene::update_world_transforms`
    pub aabb: Aabb,
    pub mask: LightMask,
    pub cast_shadow: bool,
    pub visible_this_frame: bool,
    pub shader_defs: ShaderDefs,
    /// Bumped whenever the bound material changes and shaders must be regenerated
    pub shader_generation: u64,
    lightmaps: [Option<TextureRef>; 2],
}

impl MeshInstance {
    pub fn new(node: NodeId, mesh: MeshRef, material: MaterialRef) -> Self {
        let aabb = mesh.aabb;
        Self {
            node,
            mesh,
            material,
            aabb,
            mask: LightMask::AFFECT_DYNAMIC,
            cast_shadow: true,
            visible_this_frame: false,
            shader_defs: ShaderDefs::empty(),
            shader_generation: 0,
            lightmaps: [None, None],
        }
    }

    /// Switch between lightmapped and dynamically lit rendering.
    pub fn set_lightmapped(&mut self, value: bool) {
        if value {
            self.mask = (self.mask | LightMask::AFFECT_LIGHTMAPPED)
                & !(LightMask::AFFECT_DYNAMIC | LightMask::BAKE);
        } else {
            self.lightmaps = [None, None];
            self.shader_defs.remove(
                ShaderDefs::LIGHTMAP | ShaderDefs::DIR_LIGHTMAP | ShaderDefs::LIGHTMAP_AMBIENT,
            );
            self.mask = (self.mask | LightMask::AFFECT_DYNAMIC)
                & !(LightMask::AFFECT_LIGHTMAPPED | LightMask::BAKE);
        }
    }

    pub fn set_realtime_lightmap(&mut self, pass: BakePass, texture: Option<TextureRef>) {
        self.lightmaps[pass.index()] = texture;
    }

    pub fn realtime_lightmap(&self, pass: BakePass) -> Option<&TextureRef> {
        self.lightmaps[pass.index()].as_ref()
    }

    pub fn clear_shaders(&mut self) {
        self.shader_generation += 1;
    }
}

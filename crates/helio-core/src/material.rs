use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec3;

use crate::texture::TextureRef;

/// Shader specialization constant value
#[derive(Clone, Debug, PartialEq)]
pub enum ShaderDefine {
    Bool(bool),
    U32(u32),
    F32(f32),
}

/// One of the two accumulation passes of a bake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BakePass {
    Color = 0,
    Direction = 1,
}

impl BakePass {
    pub const ALL: [BakePass; 2] = [BakePass::Color, BakePass::Direction];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Shader parameter the pass texture is bound to when sampling lightmaps
    pub fn lightmap_parameter(self) -> &'static str {
        match self {
            BakePass::Color => "texture_lightMap",
            BakePass::Direction => "texture_dirLightMap",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Back,
    Front,
}

/// Named fragment/vertex chunk slots a material may override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderChunk {
    /// Vertex position transform
    Transform,
    /// Final fragment output
    End,
}

#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub diffuse: Vec3,
    pub ambient: Vec3,
    /// Multiply scene ambient by `ambient`
    pub ambient_tint: bool,
    pub light_map: Option<TextureRef>,
    pub cull: CullMode,
    pub write_alpha: bool,
    /// Rasterize at UV1 instead of projected world position
    pub force_uv1: bool,
    pub defines: HashMap<String, ShaderDefine>,
    pub chunks: HashMap<ShaderChunk, String>,
}

pub type MaterialRef = Arc<Material>;

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            diffuse: Vec3::ONE,
            ambient: Vec3::ONE,
            ambient_tint: false,
            light_map: None,
            cull: CullMode::Back,
            write_alpha: true,
            force_uv1: false,
            defines: HashMap::new(),
            chunks: HashMap::new(),
        }
    }

    pub fn with_light_map(mut self, texture: TextureRef) -> Self {
        self.light_map = Some(texture);
        self
    }

    pub fn define(&mut self, name: impl Into<String>, value: ShaderDefine) {
        self.defines.insert(name.into(), value);
    }
}

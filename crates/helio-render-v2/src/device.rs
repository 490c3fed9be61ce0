//! Graphics device seam used by the lightmapper
//!
//! The lightmapper never talks to a GPU API directly. It creates textures and
//! render targets, draws the two full-screen lightmap filters, and labels its
//! work through this trait. `backend::wgpu` implements it on a real device and
//! `backend::software` on the CPU.

use bitflags::bitflags;
use helio_core::{RenderTarget, TextureDesc, TextureFormat, TextureRef};

use crate::filters::FilterUniforms;
use crate::Result;

bitflags! {
    /// Texture formats a device can render into
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RenderableFormats: u32 {
        const RGBA8 = 1 << 0;
        const RGBA16_FLOAT = 1 << 1;
        const RGBA32_FLOAT = 1 << 2;
    }
}

impl RenderableFormats {
    pub fn supports(self, format: TextureFormat) -> bool {
        match format {
            TextureFormat::Rgba8Unorm => self.contains(Self::RGBA8),
            TextureFormat::Rgba16Float => self.contains(Self::RGBA16_FLOAT),
            TextureFormat::Rgba32Float => self.contains(Self::RGBA32_FLOAT),
            TextureFormat::Depth32Float => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Wgpu,
    Software,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCapabilities {
    pub backend: BackendKind,
    pub max_texture_size: u32,
    pub renderable_formats: RenderableFormats,
}

impl DeviceCapabilities {
    /// Baking renders into lightmaps of `format` and samples them back, so the
    /// device must be able to use that format as a color attachment.
    pub fn supports_lightmap_baking(&self, format: TextureFormat) -> bool {
        self.renderable_formats.supports(format)
    }
}

/// Full-screen filters applied to finished lightmaps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterShader {
    /// Copy valid texels into empty neighbours
    Dilate,
    /// Edge-preserving bilateral blur
    Denoise,
}

pub trait BakeDevice {
    fn capabilities(&self) -> DeviceCapabilities;

    fn create_texture(&mut self, desc: TextureDesc) -> Result<TextureRef>;

    /// Wrap a color buffer as a render target without depth
    fn create_render_target(&mut self, name: &str, color_buffer: TextureRef) -> Result<RenderTarget> {
        Ok(RenderTarget::new(name, color_buffer, false))
    }

    /// Run `shader` over every texel of `target`, reading from `source`.
    /// Blending, depth and stencil are disabled.
    fn draw_filter(
        &mut self,
        target: &RenderTarget,
        source: &TextureRef,
        shader: FilterShader,
        uniforms: &FilterUniforms,
    ) -> Result<()>;

    fn push_marker(&mut self, _label: &str) {}

    fn pop_marker(&mut self) {}
}

//! Helio Render V2 - GPU side of the Helio lightmapper
//!
//! Provides the seams the lightmapper renders through and the pieces that
//! do not depend on the application's renderer:
//!
//! - `BakeDevice` for textures, render targets and full-screen filter draws,
//!   implemented on wgpu and on the CPU
//! - `BakeRenderer` for the application's shadow and forward passes
//! - Render target pooling for lightmap ping-pong
//! - Bake material variants with WGSL `override` specialization
//! - Dilate and bilateral denoise filters, RGBM encoding

pub mod backend;
pub mod encoding;
pub mod filters;
pub mod pipeline;
pub mod resources;
pub mod shaders;

mod device;
mod renderer;

pub use backend::{SoftwareBakeDevice, SoftwareTexture, WgpuBakeDevice, WgpuTexture};
pub use device::{BackendKind, BakeDevice, DeviceCapabilities, FilterShader, RenderableFormats};
pub use encoding::{decode_rgbm, encode_rgbm};
pub use filters::{FilterUniforms, LightmapFilters, DENOISE_KERNEL_SIZE};
pub use pipeline::{apply_defines, BakeMaterialCache, BakeMaterialKey, BakeMaterialSettings};
pub use renderer::{BakeRenderer, ForwardPass, LightArray, ShaderStats};
pub use resources::RenderTargetPool;

/// Result type for bake device and renderer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while baking on a device
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Resource error: {0}")]
    Resource(String),

    #[error("Shader error: {0}")]
    Shader(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("WGPU error: {0}")]
    Wgpu(String),
}

impl From<wgpu::Error> for Error {
    fn from(err: wgpu::Error) -> Self {
        Error::Wgpu(err.to_string())
    }
}

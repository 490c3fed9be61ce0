//! Bake material variant keys

use helio_core::{BakePass, LightmapSettings, TextureFormat};

/// Everything that distinguishes one bake material from another
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct BakeMaterialKey {
    pub pass: BakePass,
    /// Compose accumulated occlusion with the ambient color
    pub ambient_ao: bool,
}

impl BakeMaterialKey {
    pub fn new(pass: BakePass, ambient_ao: bool) -> Self {
        Self { pass, ambient_ao }
    }
}

/// Scene settings baked into material shaders at creation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BakeMaterialSettings {
    pub pixel_format: TextureFormat,
    pub ao_contrast: f32,
    pub ao_brightness: f32,
}

impl BakeMaterialSettings {
    pub fn from_lightmap_settings(settings: &LightmapSettings) -> Self {
        Self {
            pixel_format: settings.pixel_format,
            ao_contrast: settings.ambient_bake_occlusion_contrast,
            ao_brightness: settings.ambient_bake_occlusion_brightness,
        }
    }
}

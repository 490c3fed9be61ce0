//! CPU implementation of `BakeDevice`
//!
//! Textures are plain `Vec4` texel arrays and the filter draws run the
//! reference filters from `crate::filters`. Used by tests and by headless
//! tooling that only needs to exercise the bake flow.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use glam::Vec4;
use helio_core::{
    downcast_texture, FilterMode, RenderTarget, ResourceId, Texture, TextureDesc, TextureRef,
};
use parking_lot::{Mutex, RwLock};

use crate::device::{BackendKind, BakeDevice, DeviceCapabilities, FilterShader, RenderableFormats};
use crate::filters::{self, FilterUniforms};
use crate::{Error, Result};

#[derive(Debug)]
pub struct SoftwareTexture {
    id: ResourceId,
    desc: TextureDesc,
    filter: Mutex<FilterMode>,
    texels: RwLock<Vec<Vec4>>,
    live: Arc<AtomicUsize>,
}

impl SoftwareTexture {
    fn new(desc: TextureDesc, live: Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::Relaxed);
        Self {
            id: ResourceId::new(),
            filter: Mutex::new(desc.filter),
            texels: RwLock::new(vec![Vec4::ZERO; desc.texel_count()]),
            desc,
            live,
        }
    }

    /// Copy of the first layer, row-major from the top-left texel
    pub fn read_texels(&self) -> Vec<Vec4> {
        let layer = (self.desc.width * self.desc.height) as usize;
        self.texels.read()[..layer].to_vec()
    }

    pub fn texel(&self, x: u32, y: u32) -> Vec4 {
        self.texels.read()[(y * self.desc.width + x) as usize]
    }

    pub fn write_texel(&self, x: u32, y: u32, value: Vec4) {
        let index = (y * self.desc.width + x) as usize;
        self.texels.write()[index] = value;
    }

    fn write_all(&self, texels: Vec<Vec4>) {
        let mut guard = self.texels.write();
        let len = texels.len().min(guard.len());
        guard[..len].copy_from_slice(&texels[..len]);
    }
}

impl Texture for SoftwareTexture {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    fn filter(&self) -> FilterMode {
        *self.filter.lock()
    }

    fn set_filter(&self, filter: FilterMode) {
        *self.filter.lock() = filter;
    }
}

impl Drop for SoftwareTexture {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::Relaxed);
    }
}

pub struct SoftwareBakeDevice {
    capabilities: DeviceCapabilities,
    live: Arc<AtomicUsize>,
    textures_created: usize,
    filter_draws: Vec<FilterShader>,
    markers: Vec<String>,
    marker_depth: usize,
}

impl SoftwareBakeDevice {
    pub fn new() -> Self {
        Self::with_capabilities(DeviceCapabilities {
            backend: BackendKind::Software,
            max_texture_size: 4096,
            renderable_formats: RenderableFormats::all(),
        })
    }

    pub fn with_capabilities(capabilities: DeviceCapabilities) -> Self {
        Self {
            capabilities,
            live: Arc::new(AtomicUsize::new(0)),
            textures_created: 0,
            filter_draws: Vec::new(),
            markers: Vec::new(),
            marker_depth: 0,
        }
    }

    /// Textures created by this device that are still referenced
    pub fn live_textures(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    pub fn textures_created(&self) -> usize {
        self.textures_created
    }

    /// Every filter draw issued so far, in order
    pub fn filter_draws(&self) -> &[FilterShader] {
        &self.filter_draws
    }

    /// Every debug marker pushed so far, in order
    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// Texels of a texture created by this device
    pub fn texels(&self, texture: &TextureRef) -> Option<Vec<Vec4>> {
        downcast_texture::<SoftwareTexture>(texture.as_ref()).map(SoftwareTexture::read_texels)
    }
}

impl Default for SoftwareBakeDevice {
    fn default() -> Self {
        Self::new()
    }
}

fn software_texture<'a>(texture: &'a TextureRef, role: &str) -> Result<&'a SoftwareTexture> {
    downcast_texture::<SoftwareTexture>(texture.as_ref()).ok_or_else(|| {
        Error::Resource(format!(
            "{} texture {} was not created by the software device",
            role,
            texture.name()
        ))
    })
}

impl BakeDevice for SoftwareBakeDevice {
    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    fn create_texture(&mut self, desc: TextureDesc) -> Result<TextureRef> {
        let max = self.capabilities.max_texture_size;
        if desc.width > max || desc.height > max {
            return Err(Error::Resource(format!(
                "texture {} is {}x{}, device limit is {}",
                desc.name, desc.width, desc.height, max
            )));
        }
        log::trace!("Creating software texture {} ({}x{})", desc.name, desc.width, desc.height);
        self.textures_created += 1;
        Ok(Arc::new(SoftwareTexture::new(desc, self.live.clone())))
    }

    fn draw_filter(
        &mut self,
        target: &RenderTarget,
        source: &TextureRef,
        shader: FilterShader,
        uniforms: &FilterUniforms,
    ) -> Result<()> {
        let src = software_texture(source, "source")?;
        let dst = software_texture(target.color_buffer(), "target")?;
        if src.desc.width != dst.desc.width || src.desc.height != dst.desc.height {
            return Err(Error::Resource(format!(
                "filter source {} and target {} differ in size",
                src.desc.name, dst.desc.name
            )));
        }

        let (width, height) = (src.desc.width, src.desc.height);
        let input = src.read_texels();
        let output = match shader {
            FilterShader::Dilate => filters::dilate(&input, width, height, uniforms),
            FilterShader::Denoise => filters::bilateral_denoise(&input, width, height, uniforms),
        };
        dst.write_all(output);
        self.filter_draws.push(shader);
        Ok(())
    }

    fn push_marker(&mut self, label: &str) {
        self.markers.push(label.to_string());
        self.marker_depth += 1;
    }

    fn pop_marker(&mut self) {
        self.marker_depth = self.marker_depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helio_core::TextureFormat;

    #[test]
    fn live_count_follows_texture_lifetime() {
        let mut device = SoftwareBakeDevice::new();
        let texture = device
            .create_texture(TextureDesc::lightmap("lm", 8, TextureFormat::Rgba8Unorm))
            .unwrap();
        assert_eq!(device.live_textures(), 1);
        drop(texture);
        assert_eq!(device.live_textures(), 0);
        assert_eq!(device.textures_created(), 1);
    }

    #[test]
    fn oversized_textures_are_rejected() {
        let mut device = SoftwareBakeDevice::new();
        let result = device.create_texture(TextureDesc::lightmap("big", 8192, TextureFormat::Rgba8Unorm));
        assert!(matches!(result, Err(Error::Resource(_))));
    }

    #[test]
    fn dilate_draw_writes_the_target() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut device = SoftwareBakeDevice::new();
        let source = device
            .create_texture(TextureDesc::lightmap("src", 2, TextureFormat::Rgba16Float))
            .unwrap();
        let target_texture = device
            .create_texture(TextureDesc::lightmap("dst", 2, TextureFormat::Rgba16Float))
            .unwrap();
        let target = device.create_render_target("dst", target_texture.clone()).unwrap();

        let texel = Vec4::new(0.5, 0.25, 1.0, 1.0);
        downcast_texture::<SoftwareTexture>(source.as_ref())
            .unwrap()
            .write_texel(1, 1, texel);

        let mut filters = crate::LightmapFilters::new();
        filters.prepare(2, 2, source.desc().encoding);
        device
            .draw_filter(&target, &source, FilterShader::Dilate, &filters.uniforms())
            .unwrap();

        let out = device.texels(&target_texture).unwrap();
        assert!(out.iter().all(|c| *c == texel));
        assert_eq!(device.filter_draws(), &[FilterShader::Dilate]);
    }
}

//! Render target pooling for lightmap ping-pong
//!
//! Each bake pass renders into a scratch target of the node's lightmap size,
//! then hands the node's previous target back here. At most one scratch target
//! per size is kept; checking a target out moves it out of the pool, so two
//! callers can never hold the same target.

use std::collections::HashMap;

use helio_core::{RenderTarget, TextureDesc, TextureFormat};

use crate::device::BakeDevice;
use crate::Result;

pub struct RenderTargetPool {
    format: TextureFormat,
    available: HashMap<u32, RenderTarget>,
    created: usize,
}

impl RenderTargetPool {
    pub fn new(format: TextureFormat) -> Self {
        Self {
            format,
            available: HashMap::new(),
            created: 0,
        }
    }

    /// Change the format of targets created from now on. Pooled targets of
    /// the old format are dropped.
    pub fn set_format(&mut self, format: TextureFormat) {
        if self.format != format {
            self.available.clear();
            self.format = format;
        }
    }

    /// Make sure a target of `size` is pooled
    pub fn ensure<D: BakeDevice + ?Sized>(&mut self, device: &mut D, size: u32) -> Result<()> {
        if !self.available.contains_key(&size) {
            let target = self.create(device, size)?;
            self.available.insert(size, target);
        }
        Ok(())
    }

    /// Check out the pooled target of `size`, creating one if none is pooled
    pub fn get_or_create<D: BakeDevice + ?Sized>(
        &mut self,
        device: &mut D,
        size: u32,
    ) -> Result<RenderTarget> {
        if let Some(target) = self.available.remove(&size) {
            log::trace!("Reusing pooled render target {} ({}x{})", target.name(), size, size);
            return Ok(target);
        }
        self.create(device, size)
    }

    fn create<D: BakeDevice + ?Sized>(&mut self, device: &mut D, size: u32) -> Result<RenderTarget> {
        let name = format!("lightmapper_temp_lightmap_{}", size);
        log::debug!("Creating pooled render target {}", name);
        let texture = device.create_texture(TextureDesc::lightmap(name.clone(), size, self.format))?;
        self.created += 1;
        device.create_render_target(&name, texture)
    }

    /// Return a target for reuse by a later caller of the same size
    pub fn release(&mut self, size: u32, target: RenderTarget) {
        if let Some(replaced) = self.available.insert(size, target) {
            log::trace!("Dropping surplus render target {}", replaced.name());
        }
    }

    /// Borrow the pooled target of `size` without checking it out
    pub fn get(&self, size: u32) -> Option<&RenderTarget> {
        self.available.get(&size)
    }

    pub fn contains(&self, size: u32) -> bool {
        self.available.contains_key(&size)
    }

    pub fn len(&self) -> usize {
        self.available.len()
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }

    /// Targets allocated over the pool's lifetime
    pub fn created(&self) -> usize {
        self.created
    }

    pub fn clear(&mut self) {
        if !self.available.is_empty() {
            log::debug!("Releasing {} pooled render targets", self.available.len());
        }
        self.available.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::software::SoftwareBakeDevice;

    #[test]
    fn released_target_is_handed_out_again() {
        let mut device = SoftwareBakeDevice::new();
        let mut pool = RenderTargetPool::new(TextureFormat::Rgba8Unorm);

        let first = pool.get_or_create(&mut device, 64).unwrap();
        let id = first.id();
        pool.release(64, first);
        let second = pool.get_or_create(&mut device, 64).unwrap();

        assert_eq!(second.id(), id);
        assert_eq!(pool.created(), 1);
    }

    #[test]
    fn sizes_do_not_share_targets() {
        let mut device = SoftwareBakeDevice::new();
        let mut pool = RenderTargetPool::new(TextureFormat::Rgba8Unorm);

        pool.ensure(&mut device, 32).unwrap();
        pool.ensure(&mut device, 32).unwrap();
        pool.ensure(&mut device, 64).unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.created(), 2);
        assert_eq!(pool.get(64).map(|t| t.width()), Some(64));
    }

    #[test]
    fn checked_out_targets_leave_the_pool() {
        let mut device = SoftwareBakeDevice::new();
        let mut pool = RenderTargetPool::new(TextureFormat::Rgba8Unorm);

        pool.ensure(&mut device, 16).unwrap();
        let target = pool.get_or_create(&mut device, 16).unwrap();
        assert!(!pool.contains(16));
        pool.release(16, target);
        assert!(pool.contains(16));

        pool.clear();
        assert!(pool.is_empty());
        assert_eq!(device.live_textures(), 0);
    }
}

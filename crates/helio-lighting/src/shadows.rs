use std::collections::HashMap;

use helio_core::{Light, LightKind, ShadowMap, TextureDesc, TextureRef};

/// Shadow maps are interchangeable when they agree on shape and resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShadowMapKey {
    pub omni: bool,
    pub resolution: u32,
}

impl ShadowMapKey {
    pub fn for_light(light: &Light) -> Self {
        Self {
            omni: light.kind == LightKind::Omni,
            resolution: light.shadow_resolution,
        }
    }

    fn for_map(shadow_map: &ShadowMap) -> Self {
        Self {
            omni: shadow_map.omni,
            resolution: shadow_map.resolution,
        }
    }
}

/// Shadow maps shared between lights that render their shadows one at a time.
#[derive(Debug, Default)]
pub struct ShadowMapCache {
    cache: HashMap<ShadowMapKey, Vec<ShadowMap>>,
}

impl ShadowMapCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a cached shadow map suitable for `light`, creating one through
    /// `create` when none is available. Omni lights get a six-layer cube map.
    pub fn get<E>(
        &mut self,
        light: &Light,
        create: impl FnOnce(TextureDesc) -> Result<TextureRef, E>,
    ) -> Result<ShadowMap, E> {
        let key = ShadowMapKey::for_light(light);
        if let Some(shadow_map) = self.cache.get_mut(&key).and_then(Vec::pop) {
            log::trace!("Reusing cached shadow map {:?}", key);
            return Ok(shadow_map);
        }

        log::debug!("Creating shadow map {:?} for light '{}'", key, light.name);
        let layers = if key.omni { 6 } else { 1 };
        let texture = create(TextureDesc::depth(
            format!("shadow_map_{}", key.resolution),
            key.resolution,
            layers,
        ))?;
        Ok(ShadowMap {
            texture,
            resolution: key.resolution,
            omni: key.omni,
            cached: true,
        })
    }

    pub fn add(&mut self, shadow_map: ShadowMap) {
        self.cache
            .entry(ShadowMapKey::for_map(&shadow_map))
            .or_default()
            .push(shadow_map);
    }

    pub fn len(&self) -> usize {
        self.cache.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        if !self.cache.is_empty() {
            log::debug!("Dropping {} cached shadow maps", self.len());
        }
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use helio_core::{FilterMode, ResourceId, Texture};
    use std::convert::Infallible;
    use std::sync::Arc;

    #[derive(Debug)]
    struct DepthTexture {
        id: ResourceId,
        desc: TextureDesc,
    }

    impl Texture for DepthTexture {
        fn id(&self) -> ResourceId {
            self.id
        }

        fn desc(&self) -> &TextureDesc {
            &self.desc
        }

        fn filter(&self) -> FilterMode {
            FilterMode::Nearest
        }

        fn set_filter(&self, _filter: FilterMode) {}
    }

    fn create(desc: TextureDesc) -> Result<TextureRef, Infallible> {
        Ok(Arc::new(DepthTexture {
            id: ResourceId::new(),
            desc,
        }))
    }

    #[test]
    fn returned_maps_are_reused() {
        let mut cache = ShadowMapCache::new();
        let light = Light::spot("spot", Vec3::ZERO, 5.0, 20.0, 30.0);

        let first = cache.get(&light, create).unwrap();
        let id = first.texture.id();
        cache.add(first);
        assert_eq!(cache.len(), 1);

        let second = cache.get(&light, create).unwrap();
        assert_eq!(second.texture.id(), id);
        assert!(cache.is_empty());
    }

    #[test]
    fn omni_maps_are_cube_maps() {
        let mut cache = ShadowMapCache::new();
        let light = Light::omni("omni", Vec3::ZERO, 5.0);
        let map = cache.get(&light, create).unwrap();
        assert!(map.omni);
        assert_eq!(map.texture.desc().layers, 6);
    }

    #[test]
    fn maps_of_other_resolutions_are_not_shared() {
        let mut cache = ShadowMapCache::new();
        let mut light = Light::directional("sun");
        let map = cache.get(&light, create).unwrap();
        let id = map.texture.id();
        cache.add(map);

        light.shadow_resolution = 2048;
        let other = cache.get(&light, create).unwrap();
        assert_ne!(other.texture.id(), id);
        assert_eq!(cache.len(), 1);
    }
}

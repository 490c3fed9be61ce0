//! Lights as seen by the baker
//!
//! Wrapping a light records everything the bake is going to touch so it can be
//! put back afterwards. Soft shadows and ambient occlusion are approximated by
//! splitting a light into virtual lights, each rendered with a fraction of the
//! intensity and a perturbed direction.

use std::f32::consts::PI;

use glam::{Quat, Vec3};
use helio_core::{
    rotation_from_euler_degrees, Aabb, Light, LightId, LightKind, LightMask, Scene, ShadowMap,
    ShadowUpdateMode,
};
use helio_lighting::{ShadowMapCache, VirtualLightSampling};

/// Light properties changed while baking
#[derive(Debug, Clone)]
pub struct StoredLightState {
    pub enabled: bool,
    pub mask: LightMask,
    pub is_static: bool,
    pub shadow_update_mode: ShadowUpdateMode,
    pub intensity: f32,
    pub rotation: Quat,
    pub num_cascades: u32,
    pub cast_shadows: bool,
    shadow_map: Option<ShadowMap>,
}

impl StoredLightState {
    pub fn capture(light: &Light) -> Self {
        Self {
            enabled: light.enabled,
            mask: light.mask,
            is_static: light.is_static,
            shadow_update_mode: light.shadow_update_mode,
            intensity: light.intensity,
            rotation: light.rotation,
            num_cascades: light.num_cascades,
            cast_shadows: light.cast_shadows,
            shadow_map: light.shadow_map.clone(),
        }
    }

    pub fn apply(&self, light: &mut Light) {
        light.enabled = self.enabled;
        light.mask = self.mask;
        light.is_static = self.is_static;
        light.shadow_update_mode = self.shadow_update_mode;
        light.intensity = self.intensity;
        light.rotation = self.rotation;
        light.num_cascades = self.num_cascades;
        light.cast_shadows = self.cast_shadows;
        light.shadow_map = self.shadow_map.clone();
    }
}

#[derive(Debug)]
pub enum BakeLight {
    /// Sky light owned by the baker, sampled over a spherical cap for ambient occlusion
    Ambient {
        light: Light,
        stored: StoredLightState,
    },
    /// A light of the scene
    Simple {
        id: LightId,
        stored: StoredLightState,
        bounds: Option<Aabb>,
    },
}

fn shadows_disabled(scene: &Scene) -> bool {
    scene.clustered_lighting_enabled && !scene.lighting.shadows_enabled
}

fn prepare_for_bake(light: &mut Light, shadows_disabled: bool) {
    light.num_cascades = 1;
    if shadows_disabled {
        light.cast_shadows = false;
    }
}

impl BakeLight {
    pub fn ambient(scene: &Scene) -> Self {
        let settings = &scene.lightmap;
        let mut light = Light::directional("AmbientLight")
            .with_mask(LightMask::AFFECT_DYNAMIC | LightMask::BAKE)
            .with_cast_shadows(true);
        light.bake_num_samples = settings.ambient_bake_num_samples;
        light.normal_offset_bias = 0.05;
        light.shadow_bias = 0.2;
        light.shadow_resolution = 2048;
        light.color = Vec3::ONE;
        light.intensity = 1.0;
        light.bake_dir = false;

        let stored = StoredLightState::capture(&light);
        prepare_for_bake(&mut light, shadows_disabled(scene));
        BakeLight::Ambient { light, stored }
    }

    pub fn simple(scene: &mut Scene, id: LightId) -> Self {
        let stored = StoredLightState::capture(scene.light(id));
        let bounds = scene.light(id).bounding_sphere().map(|sphere| sphere.to_aabb());

        let disabled = shadows_disabled(scene);
        prepare_for_bake(scene.light_mut(id), disabled);

        BakeLight::Simple { id, stored, bounds }
    }

    pub fn is_ambient(&self) -> bool {
        matches!(self, BakeLight::Ambient { .. })
    }

    pub fn light<'a>(&'a self, scene: &'a Scene) -> &'a Light {
        match self {
            BakeLight::Ambient { light, .. } => light,
            BakeLight::Simple { id, .. } => scene.light(*id),
        }
    }

    pub fn light_mut<'a>(&'a mut self, scene: &'a mut Scene) -> &'a mut Light {
        match self {
            BakeLight::Ambient { light, .. } => light,
            BakeLight::Simple { id, .. } => scene.light_mut(*id),
        }
    }

    fn stored(&self) -> &StoredLightState {
        match self {
            BakeLight::Ambient { stored, .. } | BakeLight::Simple { stored, .. } => stored,
        }
    }

    /// Bake order: ambient first, then directional, omni and spot lights
    pub fn sort_key(&self, scene: &Scene) -> u8 {
        match self {
            BakeLight::Ambient { .. } => 0,
            BakeLight::Simple { id, .. } => match scene.light(*id).kind {
                LightKind::Directional => 1,
                LightKind::Omni => 2,
                LightKind::Spot => 3,
            },
        }
    }

    /// World bounds of a local light; `None` for unbounded lights
    pub fn light_bounds(&self) -> Option<&Aabb> {
        match self {
            BakeLight::Ambient { .. } => None,
            BakeLight::Simple { bounds, .. } => bounds.as_ref(),
        }
    }

    pub fn num_virtual_lights(&self, scene: &Scene) -> u32 {
        let light = self.light(scene);
        match self {
            BakeLight::Ambient { .. } => light.bake_num_samples.max(1),
            BakeLight::Simple { .. } if light.kind == LightKind::Directional => {
                light.bake_num_samples.max(1)
            }
            BakeLight::Simple { .. } => 1,
        }
    }

    /// Point and scale the light for virtual light `index` of `count`
    pub fn prepare_virtual_light(
        &mut self,
        scene: &mut Scene,
        index: u32,
        count: u32,
        sampling: &VirtualLightSampling,
    ) {
        let gamma = scene.gamma_correction.exponent();
        let sphere_part = scene.lightmap.ambient_bake_sphere_part;
        let count_f = count.max(1) as f32;

        match self {
            BakeLight::Simple { id, stored, .. } => {
                let light = scene.light_mut(*id);
                light.rotation = stored.rotation;
                if index > 0 {
                    let offset = sampling.disk_point(index, count) * light.bake_area * 0.5;
                    light.rotation *= rotation_from_euler_degrees(offset.x, 0.0, offset.y);
                }
                light.intensity = (stored.intensity.powf(gamma) / count_f).powf(1.0 / gamma);
            }
            BakeLight::Ambient { light, .. } => {
                let point = sampling.sphere_point(index, count, 0.0, sphere_part);
                light.rotation = Quat::from_rotation_arc(Vec3::NEG_Y, -point.normalize());
                let energy = 2.0 * PI * sphere_part;
                light.intensity = (energy.powf(gamma) / count_f).powf(1.0 / gamma);
            }
        }
    }

    pub fn start_bake(&mut self, scene: &mut Scene) {
        let light = self.light_mut(scene);
        light.enabled = true;
        light.shadow_map = None;
        light.begin_frame();
    }

    /// Disable the light and hand a cached shadow map back to `cache`
    pub fn end_bake(&mut self, scene: &mut Scene, cache: &mut ShadowMapCache) {
        let light = self.light_mut(scene);
        if let Some(shadow_map) = light.shadow_map.take() {
            if shadow_map.cached {
                cache.add(shadow_map);
            }
        }
        light.enabled = false;
    }

    /// Put back everything wrapping and baking changed
    pub fn restore(&mut self, scene: &mut Scene) {
        let stored = self.stored().clone();
        stored.apply(self.light_mut(scene));
    }
}

/// Lights wrapped for one bake
#[derive(Debug, Default)]
pub struct PreparedLights {
    /// The ambient light when baking ambient, then every scene light
    pub lights: Vec<BakeLight>,
    /// Indices into `lights` of the lights to bake, in bake order
    pub bake_order: Vec<usize>,
}

impl PreparedLights {
    pub fn restore(&mut self, scene: &mut Scene) {
        for light in &mut self.lights {
            light.restore(scene);
        }
    }
}

/// Wrap every light of the scene and pick those that contribute to the bake
pub fn prepare_lights_to_bake(scene: &mut Scene) -> PreparedLights {
    let mut prepared = PreparedLights::default();

    if scene.lightmap.ambient_bake {
        prepared.bake_order.push(prepared.lights.len());
        prepared.lights.push(BakeLight::ambient(scene));
    }

    let ids: Vec<LightId> = scene.light_ids().collect();
    for id in ids {
        let index = prepared.lights.len();
        prepared.lights.push(BakeLight::simple(scene, id));

        let light = scene.light_mut(id);
        if light.enabled && light.mask.contains(LightMask::BAKE) {
            light.is_static = false;
            light.mask = LightMask::EVERYTHING;
            light.shadow_update_mode = if light.kind == LightKind::Directional {
                ShadowUpdateMode::Realtime
            } else {
                ShadowUpdateMode::ThisFrame
            };
            prepared.bake_order.push(index);
        }
    }

    let lights = &prepared.lights;
    prepared
        .bake_order
        .sort_by_key(|&index| lights[index].sort_key(scene));
    log::debug!(
        "Prepared {} of {} lights for baking",
        prepared.bake_order.len(),
        prepared.lights.len()
    );
    prepared
}

#[cfg(test)]
mod tests {
    use super::*;
    use helio_core::GammaCorrection;

    fn scene_with_lights() -> (Scene, Vec<LightId>) {
        let mut scene = Scene::new();
        let ids = vec![
            scene.add_light(Light::spot("spot", Vec3::Y, 5.0, 20.0, 30.0)),
            scene.add_light(Light::omni("omni", Vec3::ZERO, 5.0)),
            scene.add_light(Light::directional("sun").with_bake_samples(8, 10.0)),
            scene.add_light(Light::directional("dynamic only").with_mask(LightMask::AFFECT_DYNAMIC)),
        ];
        (scene, ids)
    }

    #[test]
    fn bake_order_is_by_kind_with_ambient_first() {
        let (mut scene, _) = scene_with_lights();
        scene.lightmap.ambient_bake = true;
        let prepared = prepare_lights_to_bake(&mut scene);

        assert_eq!(prepared.lights.len(), 5);
        let names: Vec<_> = prepared
            .bake_order
            .iter()
            .map(|&i| prepared.lights[i].light(&scene).name.clone())
            .collect();
        assert_eq!(names, ["AmbientLight", "sun", "omni", "spot"]);
    }

    #[test]
    fn restore_undoes_every_change() {
        let (mut scene, ids) = scene_with_lights();
        scene.light_mut(ids[1]).is_static = true;
        let before: Vec<_> = scene.lights().to_vec();

        let mut prepared = prepare_lights_to_bake(&mut scene);
        assert!(!scene.light(ids[1]).is_static);
        assert_eq!(scene.light(ids[1]).mask, LightMask::EVERYTHING);
        assert_eq!(scene.light(ids[1]).shadow_update_mode, ShadowUpdateMode::ThisFrame);
        assert_eq!(scene.light(ids[3]).mask, LightMask::AFFECT_DYNAMIC);
        assert!(scene.lights().iter().all(|l| l.num_cascades == 1));

        let sampling = VirtualLightSampling::default();
        for &index in &prepared.bake_order {
            prepared.lights[index].prepare_virtual_light(&mut scene, 3, 8, &sampling);
            prepared.lights[index].start_bake(&mut scene);
        }
        prepared.restore(&mut scene);

        for (light, original) in scene.lights().iter().zip(&before) {
            assert_eq!(light.enabled, original.enabled);
            assert_eq!(light.mask, original.mask);
            assert_eq!(light.is_static, original.is_static);
            assert_eq!(light.shadow_update_mode, original.shadow_update_mode);
            assert_eq!(light.intensity, original.intensity);
            assert_eq!(light.rotation, original.rotation);
            assert_eq!(light.num_cascades, original.num_cascades);
        }
    }

    #[test]
    fn only_directional_lights_get_virtual_lights() {
        let (mut scene, _) = scene_with_lights();
        let prepared = prepare_lights_to_bake(&mut scene);
        let counts: Vec<_> = prepared
            .bake_order
            .iter()
            .map(|&i| prepared.lights[i].num_virtual_lights(&scene))
            .collect();
        assert_eq!(counts, [8, 1, 1]);
    }

    #[test]
    fn virtual_light_intensity_splits_energy() {
        let mut scene = Scene::new();
        scene.gamma_correction = GammaCorrection::None;
        let id = scene.add_light(Light::directional("sun").with_bake_samples(4, 10.0));
        scene.light_mut(id).intensity = 2.0;
        let mut light = BakeLight::simple(&mut scene, id);

        let sampling = VirtualLightSampling::GoldenSpiral;
        light.prepare_virtual_light(&mut scene, 0, 4, &sampling);
        assert!((scene.light(id).intensity - 0.5).abs() < 1e-6);
        assert_eq!(scene.light(id).rotation, Quat::IDENTITY);

        light.prepare_virtual_light(&mut scene, 2, 4, &sampling);
        assert_ne!(scene.light(id).rotation, Quat::IDENTITY);
    }

    #[test]
    fn ambient_samples_stay_inside_the_cap() {
        let mut scene = Scene::new();
        scene.lightmap.ambient_bake = true;
        scene.lightmap.ambient_bake_num_samples = 16;
        scene.lightmap.ambient_bake_sphere_part = 0.5;
        let mut light = BakeLight::ambient(&scene);
        assert_eq!(light.num_virtual_lights(&scene), 16);

        let sampling = VirtualLightSampling::GoldenSpiral;
        for i in 0..16 {
            light.prepare_virtual_light(&mut scene, i, 16, &sampling);
            // hemisphere samples light the scene from above
            assert!(light.light(&scene).direction().y <= 1e-5);
        }
        assert!(light.light(&scene).cast_shadows);
        assert_eq!(light.light(&scene).shadow_resolution, 2048);
    }

    #[test]
    fn clustered_without_shadows_disables_casting() {
        let mut scene = Scene::new();
        scene.clustered_lighting_enabled = true;
        scene.lighting.shadows_enabled = false;
        let id = scene.add_light(Light::omni("omni", Vec3::ZERO, 5.0).with_cast_shadows(true));
        let mut light = BakeLight::simple(&mut scene, id);
        assert!(!scene.light(id).cast_shadows);
        light.restore(&mut scene);
        assert!(scene.light(id).cast_shadows);
    }

    #[test]
    fn end_bake_disables_the_light() {
        let mut scene = Scene::new();
        let id = scene.add_light(Light::omni("omni", Vec3::ZERO, 5.0));
        let mut light = BakeLight::simple(&mut scene, id);
        let mut cache = ShadowMapCache::new();

        light.start_bake(&mut scene);
        assert!(scene.light(id).enabled);
        light.end_bake(&mut scene, &mut cache);
        assert!(!scene.light(id).enabled);
        assert!(cache.is_empty());
    }
}

//! Lightmap baking
//!
//! A bake renders every contributing light into the UV1 atlas of every bake
//! node, one light (or virtual light) at a time. Each forward pass reads the
//! node's current accumulation through its realtime lightmap binding and
//! writes the sum into a scratch target of the same size, which then becomes
//! the node's target. The finished lightmaps are dilated, optionally denoised
//! and handed to the scene's mesh instances.

use std::mem;
use std::time::Instant;

use glam::{UVec3, Vec3, Vec4};
use helio_core::{
    Aabb, BakePass, Camera, FilterMode, Light, LightKind, LightMask, MaterialRef, MeshInstanceId,
    NodeId, Projection, Scene, ShaderDefs, Sphere, TextureDesc, TextureFormat, TextureRef,
};
use helio_culling::Frustum;
use helio_lighting::{LightingParams, ShadowMapCache, WorldClusters};
use helio_render_v2::{
    BakeDevice, BakeMaterialCache, BakeMaterialKey, BakeMaterialSettings, BakeRenderer,
    FilterShader, ForwardPass, LightArray, LightmapFilters, RenderTargetPool,
};

use crate::bake_light::{prepare_lights_to_bake, BakeLight, PreparedLights};
use crate::bake_node::{mesh_instance_bounds, BakeNode};
use crate::collect::collect_models;
use crate::config::{BakeMode, LightmapperConfig};
use crate::lightmap_size::{calculate_lightmap_size, AssetRegistry};
use crate::scene_state::SceneStateGuard;
use crate::stats::BakeStats;
use crate::Result;

/// What a call to `Lightmapper::bake` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BakeOutcome {
    /// Lightmaps were baked and bound for this many bake nodes
    Baked { lightmaps: usize },
    /// The device cannot render into the configured lightmap format; the
    /// scene was left untouched
    Unsupported,
}

/// Per virtual light inputs shared by every node
struct BakeContext<'a> {
    casters: &'a [MeshInstanceId],
    caster_bounds: Aabb,
    pass_count: usize,
    black: &'a TextureRef,
}

pub struct Lightmapper<D: BakeDevice, R: BakeRenderer> {
    device: D,
    renderer: R,
    config: LightmapperConfig,
    assets: Box<dyn AssetRegistry>,
    stats: BakeStats,

    filters: LightmapFilters,
    pool: RenderTargetPool,
    materials: BakeMaterialCache,
    shadow_map_cache: ShadowMapCache,
    black: Option<TextureRef>,
    camera: Camera,

    lighting_params: Option<LightingParams>,
    world_clusters: Option<WorldClusters>,
}

impl<D: BakeDevice, R: BakeRenderer> Lightmapper<D, R> {
    pub fn new(device: D, renderer: R) -> Self {
        Self {
            device,
            renderer,
            config: LightmapperConfig::default(),
            assets: Box::new(()),
            stats: BakeStats::default(),
            filters: LightmapFilters::new(),
            pool: RenderTargetPool::new(TextureFormat::Rgba8Unorm),
            materials: BakeMaterialCache::new(),
            shadow_map_cache: ShadowMapCache::new(),
            black: None,
            camera: bake_camera(),
            lighting_params: None,
            world_clusters: None,
        }
    }

    pub fn with_config(mut self, config: LightmapperConfig) -> Self {
        self.config = config;
        self
    }

    /// Registry consulted for the lightmap area of model assets
    pub fn with_assets(mut self, assets: impl AssetRegistry + 'static) -> Self {
        self.assets = Box::new(assets);
        self
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn config(&self) -> &LightmapperConfig {
        &self.config
    }

    /// Counters of the most recent bake
    pub fn stats(&self) -> &BakeStats {
        &self.stats
    }

    pub fn calculate_lightmap_size(&self, scene: &Scene, node: NodeId) -> u32 {
        calculate_lightmap_size(scene, node, self.assets.as_ref())
    }

    /// Bake lightmaps for the lightmapped nodes under `nodes`, or for the
    /// whole scene when `nodes` is `None`. Every enabled render component of
    /// the scene casts shadows into the bake.
    pub fn bake(
        &mut self,
        scene: &mut Scene,
        nodes: Option<&[NodeId]>,
        mode: BakeMode,
    ) -> Result<BakeOutcome> {
        let format = scene.lightmap.pixel_format;
        if !self.device.capabilities().supports_lightmap_baking(format) {
            log::warn!(
                "Lightmapper: the device cannot render to {:?} lightmaps, baking is not supported",
                format
            );
            return Ok(BakeOutcome::Unsupported);
        }

        let start = Instant::now();
        self.stats = BakeStats::default();
        let shaders_before = self.renderer.shader_stats();

        let mut bake_nodes = Vec::new();
        let mut all_nodes = Vec::new();
        match nodes {
            Some(roots) => {
                for &root in roots {
                    collect_models(scene, root, Some(&mut bake_nodes), None);
                }
                collect_models(scene, scene.root(), None, Some(&mut all_nodes));
            }
            None => {
                collect_models(scene, scene.root(), Some(&mut bake_nodes), Some(&mut all_nodes));
            }
        }
        log::debug!(
            "Lightmapper: {} bake nodes, {} shadow casting nodes",
            bake_nodes.len(),
            all_nodes.len()
        );

        self.device.push_marker("LMBake");
        let pass_count = mode.pass_count();
        let mut result = Ok(());
        if !bake_nodes.is_empty() {
            self.renderer.shadow_frame_update();
            set_lightmapping(scene, &bake_nodes, false, pass_count);

            result = self
                .init_bake(scene)
                .and_then(|black| self.bake_internal(scene, pass_count, &black, &mut bake_nodes, &all_nodes));

            set_lightmapping(scene, &bake_nodes, result.is_ok(), pass_count);
        }
        self.finish_bake(scene, &mut bake_nodes);
        self.device.pop_marker();

        let shaders_after = self.renderer.shader_stats();
        self.stats.shaders_linked = shaders_after.linked.saturating_sub(shaders_before.linked);
        self.stats.compile_time = shaders_after
            .compile_time
            .saturating_sub(shaders_before.compile_time);
        self.stats.total_render_time = start.elapsed();
        result?;

        self.stats.lightmap_count = bake_nodes.len();
        log::info!(
            "Lightmapper: baked {} lightmaps in {:?} ({} passes, forward {:?}, shadows {:?}, targets {:?})",
            self.stats.lightmap_count,
            self.stats.total_render_time,
            self.stats.render_passes,
            self.stats.forward_time,
            self.stats.shadow_map_time,
            self.stats.fbo_time
        );
        Ok(BakeOutcome::Baked {
            lightmaps: bake_nodes.len(),
        })
    }

    // ── Session setup and teardown ────────────────────────────────────────

    /// Create the resources kept between bakes and return the black placeholder
    fn init_bake(&mut self, scene: &Scene) -> Result<TextureRef> {
        let black = match &self.black {
            Some(black) => black.clone(),
            None => {
                let texture = self
                    .device
                    .create_texture(TextureDesc::lightmap("lightmapBlack", 4, TextureFormat::Rgba8Unorm))?;
                self.black = Some(texture.clone());
                texture
            }
        };

        if scene.clustered_lighting_enabled {
            let params = LightingParams::from_settings(&scene.lighting)
                .with_cells(UVec3::splat(3))
                .with_max_lights_per_cell(4);
            self.lighting_params = Some(params);
            self.world_clusters = Some(WorldClusters::new("ClusterLightmapper"));
        }
        Ok(black)
    }

    fn finish_bake(&mut self, scene: &Scene, bake_nodes: &mut [BakeNode]) {
        self.materials.clear();
        self.pool.clear();
        for node in bake_nodes.iter_mut() {
            node.render_targets.clear();
        }
        if !scene.clustered_lighting_enabled {
            self.shadow_map_cache.clear();
        }
        self.world_clusters = None;
    }

    fn create_materials(&mut self, scene: &Scene, pass_count: usize, black: &TextureRef) {
        let settings = BakeMaterialSettings::from_lightmap_settings(&scene.lightmap);
        for &pass in &BakePass::ALL[..pass_count] {
            self.materials
                .get_or_create(BakeMaterialKey::new(pass, false), &settings, black);
        }
        if scene.lightmap.ambient_bake {
            self.materials
                .get_or_create(BakeMaterialKey::new(BakePass::Color, true), &settings, black);
        }
    }

    fn bake_internal(
        &mut self,
        scene: &mut Scene,
        pass_count: usize,
        black: &TextureRef,
        bake_nodes: &mut [BakeNode],
        all_nodes: &[BakeNode],
    ) -> Result<()> {
        self.create_materials(scene, pass_count, black);

        let mut scene = SceneStateGuard::enter(scene);
        self.renderer.set_scene_constants(&scene);

        scene.update_world_transforms();
        for node in bake_nodes.iter_mut() {
            node.compute_bounds(&scene);
        }
        self.allocate_textures(&scene, bake_nodes, pass_count)?;

        let mut lights = prepare_lights_to_bake(&mut scene);
        let result = self
            .render_lights(&mut scene, &mut lights, bake_nodes, all_nodes, pass_count, black)
            .and_then(|()| self.postprocess(&scene, bake_nodes));

        for node in all_nodes {
            node.restore(&mut scene);
        }
        lights.restore(&mut scene);
        result
    }

    fn allocate_textures(
        &mut self,
        scene: &Scene,
        bake_nodes: &mut [BakeNode],
        pass_count: usize,
    ) -> Result<()> {
        let start = Instant::now();
        let format = scene.lightmap.pixel_format;
        self.pool.set_format(format);

        for (i, node) in bake_nodes.iter_mut().enumerate() {
            let size = calculate_lightmap_size(scene, node.node, self.assets.as_ref());
            for _ in 0..pass_count {
                let name = format!("lightmapper_lightmap_{}", i);
                let texture = self
                    .device
                    .create_texture(TextureDesc::lightmap(name.clone(), size, format))?;
                node.render_targets
                    .push(self.device.create_render_target(&name, texture)?);
            }
            self.pool.ensure(&mut self.device, size)?;
        }

        self.stats.fbo_time += start.elapsed();
        Ok(())
    }

    // ── Light loop ────────────────────────────────────────────────────────

    fn render_lights(
        &mut self,
        scene: &mut Scene,
        prepared: &mut PreparedLights,
        bake_nodes: &mut [BakeNode],
        all_nodes: &[BakeNode],
        pass_count: usize,
        black: &TextureRef,
    ) -> Result<()> {
        scene.update_world_transforms();

        let mut casters = Vec::new();
        for node in all_nodes {
            if let Some(component) = scene.render_component_mut(node.node) {
                component.cast_shadows = component.cast_shadows_lightmap;
                if component.cast_shadows_lightmap {
                    casters.extend_from_slice(&node.mesh_instances);
                }
            }
        }
        for &id in &casters {
            scene.mesh_instance_mut(id).visible_this_frame = true;
        }
        self.renderer.update_skinning(scene, &casters)?;

        let ctx = BakeContext {
            casters: &casters,
            caster_bounds: mesh_instance_bounds(scene, &casters),
            pass_count,
            black,
        };

        for node in bake_nodes.iter() {
            for &id in &node.mesh_instances {
                let mesh_instance = scene.mesh_instance_mut(id);
                mesh_instance.set_lightmapped(false);
                mesh_instance.mask = LightMask::BAKE;
                let color = mesh_instance
                    .material
                    .light_map
                    .clone()
                    .unwrap_or_else(|| black.clone());
                mesh_instance.set_realtime_lightmap(BakePass::Color, Some(color));
                mesh_instance.set_realtime_lightmap(BakePass::Direction, Some(black.clone()));
            }
        }

        let PreparedLights { lights, bake_order } = prepared;
        for &index in bake_order.iter() {
            lights[index].light_mut(scene).enabled = false;
        }

        for &index in bake_order.iter() {
            let bake_light = &mut lights[index];
            let mut count = bake_light.num_virtual_lights(scene);
            if pass_count > 1 && count > 1 && bake_light.light(scene).bake_dir {
                log::warn!(
                    "Lightmapper: light '{}' bakes direction and cannot use {} samples, forcing it to one",
                    bake_light.light(scene).name,
                    count
                );
                count = 1;
            }

            for virtual_index in 0..count {
                if count > 1 {
                    bake_light.prepare_virtual_light(
                        scene,
                        virtual_index,
                        count,
                        &self.config.virtual_light_sampling,
                    );
                }
                bake_light.start_bake(scene);
                let result =
                    self.render_virtual_light(scene, bake_light, virtual_index, count, bake_nodes, &ctx);
                bake_light.end_bake(scene, &mut self.shadow_map_cache);
                result?;
            }
        }
        Ok(())
    }

    fn render_virtual_light(
        &mut self,
        scene: &mut Scene,
        bake_light: &mut BakeLight,
        virtual_index: u32,
        count: u32,
        bake_nodes: &mut [BakeNode],
        ctx: &BakeContext<'_>,
    ) -> Result<()> {
        let kind = bake_light.light(scene).kind;
        let spot_camera = (kind == LightKind::Spot).then(|| spot_shadow_camera(bake_light.light(scene)));
        let mut shadow_map_rendered = false;

        for node in bake_nodes.iter_mut() {
            if !self.light_affects_node(scene, bake_light, node, spot_camera.as_ref(), &ctx.caster_bounds) {
                continue;
            }

            if scene.clustered_lighting_enabled {
                if let Some(params) = &self.lighting_params {
                    let light = bake_light.light(scene);
                    let atlas_lights: Vec<&Light> = if kind == LightKind::Directional {
                        Vec::new()
                    } else {
                        vec![light]
                    };
                    self.renderer.update_light_texture_atlas(&atlas_lights, params);
                }
            }

            if !shadow_map_rendered {
                self.render_shadow_map(scene, bake_light, ctx.casters, spot_camera.as_ref())?;
                shadow_map_rendered = true;
            }

            if scene.clustered_lighting_enabled {
                if let (Some(clusters), Some(params)) = (self.world_clusters.as_mut(), &self.lighting_params) {
                    clusters.update(&[bake_light.light(scene)], params);
                }
            }

            let backup: Vec<MaterialRef> = node
                .mesh_instances
                .iter()
                .map(|&id| scene.mesh_instance(id).material.clone())
                .collect();
            let result = self.render_node_passes(scene, bake_light, virtual_index, count, node, ctx);
            for (&id, material) in node.mesh_instances.iter().zip(backup) {
                scene.mesh_instance_mut(id).material = material;
            }
            result?;
        }
        Ok(())
    }

    fn light_affects_node(
        &mut self,
        scene: &Scene,
        bake_light: &BakeLight,
        node: &BakeNode,
        spot_camera: Option<&Camera>,
        caster_bounds: &Aabb,
    ) -> bool {
        let light = bake_light.light(scene);
        if light.kind == LightKind::Directional {
            frame_directional_camera(&mut self.camera, caster_bounds);
            return true;
        }

        if let Some(bounds) = bake_light.light_bounds() {
            if !bounds.intersects(&node.bounds) {
                return false;
            }
        }

        match spot_camera {
            Some(camera) => {
                let frustum = Frustum::from_camera(camera);
                node.mesh_instances.iter().any(|&id| {
                    let aabb = &scene.mesh_instance(id).aabb;
                    frustum.test_sphere(&Sphere::new(aabb.center(), aabb.radius()))
                })
            }
            None => true,
        }
    }

    fn render_shadow_map(
        &mut self,
        scene: &mut Scene,
        bake_light: &mut BakeLight,
        casters: &[MeshInstanceId],
        spot_camera: Option<&Camera>,
    ) -> Result<()> {
        let clustered = scene.clustered_lighting_enabled;
        if !bake_light.light(scene).cast_shadows || (clustered && !scene.lighting.shadows_enabled) {
            return Ok(());
        }

        if !clustered && bake_light.light(scene).shadow_map.is_none() {
            let device = &mut self.device;
            let shadow_map = self
                .shadow_map_cache
                .get(bake_light.light(scene), |desc| device.create_texture(desc))?;
            bake_light.light_mut(scene).shadow_map = Some(shadow_map);
        }

        let camera = spot_camera.unwrap_or(&self.camera);
        let elapsed = self
            .renderer
            .render_shadows(scene, bake_light.light(scene), camera, casters)?;
        self.stats.shadow_map_time += elapsed;
        Ok(())
    }

    fn render_node_passes(
        &mut self,
        scene: &mut Scene,
        bake_light: &BakeLight,
        virtual_index: u32,
        count: u32,
        node: &mut BakeNode,
        ctx: &BakeContext<'_>,
    ) -> Result<()> {
        let ambient = bake_light.is_ambient();
        let settings = BakeMaterialSettings::from_lightmap_settings(&scene.lightmap);
        let shaders_updated_on_first_pass = scene.update_shaders;

        for &pass in &BakePass::ALL[..ctx.pass_count] {
            if pass != BakePass::Color && (virtual_index > 0 || ambient) {
                break;
            }
            let Some(size) = node.render_targets.get(pass.index()).map(|t| t.width()) else {
                break;
            };
            let scratch = self.pool.get_or_create(&mut self.device, size)?;

            if pass != BakePass::Color && shaders_updated_on_first_pass {
                scene.update_shaders = true;
            }

            // occlusion is composed with ambient once it is fully accumulated
            let ambient_ao = ambient && pass == BakePass::Color && virtual_index + 1 == count;
            let material = self
                .materials
                .get_or_create(BakeMaterialKey::new(pass, ambient_ao), &settings, ctx.black);
            for &id in &node.mesh_instances {
                scene.mesh_instance_mut(id).material = material.clone();
            }
            self.renderer.update_shaders(scene, &node.mesh_instances);

            let light = bake_light.light(scene);
            let lights = LightArray::single(light);
            let forward = ForwardPass {
                camera: &self.camera,
                target: &scratch,
                mesh_instances: &node.mesh_instances,
                lights: &lights,
                bake_dir: (pass == BakePass::Direction)
                    .then(|| if light.bake_dir { 1.0 } else { 0.0 }),
                clusters: self.world_clusters.as_ref(),
            };
            let elapsed = self.renderer.render_forward(scene, &forward)?;
            self.stats.forward_time += elapsed;
            self.stats.render_passes += 1;

            let previous = mem::replace(&mut node.render_targets[pass.index()], scratch);
            self.pool.release(size, previous);

            let texture = node.render_targets[pass.index()].color_buffer().clone();
            for &id in &node.mesh_instances {
                let mesh_instance = scene.mesh_instance_mut(id);
                mesh_instance.set_realtime_lightmap(pass, Some(texture.clone()));
                mesh_instance.shader_defs |= ShaderDefs::LIGHTMAP;
            }
        }
        Ok(())
    }

    // ── Post-processing ───────────────────────────────────────────────────

    fn postprocess(&mut self, scene: &Scene, bake_nodes: &[BakeNode]) -> Result<()> {
        let settings = &scene.lightmap;
        if settings.filter_enabled {
            self.filters
                .prepare_denoise(settings.filter_range, settings.filter_smoothness);
        }

        for node in bake_nodes {
            for (pass_index, target) in node.render_targets.iter().enumerate() {
                let size = target.width();
                let scratch = self.pool.get_or_create(&mut self.device, size)?;
                self.filters
                    .prepare(size, target.height(), target.color_buffer().desc().encoding);
                let uniforms = self.filters.uniforms();

                for i in 0..self.config.dilate_iterations {
                    let shader = if settings.filter_enabled && pass_index == 0 && i == 0 {
                        FilterShader::Denoise
                    } else {
                        FilterShader::Dilate
                    };
                    self.device
                        .draw_filter(&scratch, target.color_buffer(), shader, &uniforms)?;
                    self.device.draw_filter(
                        target,
                        scratch.color_buffer(),
                        FilterShader::Dilate,
                        &uniforms,
                    )?;
                }
                self.pool.release(size, scratch);
            }
        }
        Ok(())
    }
}

/// Bind finished lightmaps to the bake nodes' mesh instances, or unbind them
fn set_lightmapping(scene: &mut Scene, bake_nodes: &[BakeNode], value: bool, pass_count: usize) {
    let mut defs = ShaderDefs::LIGHTMAP;
    if pass_count > 1 {
        defs |= ShaderDefs::DIR_LIGHTMAP;
    }
    if scene.lightmap.ambient_bake {
        defs |= ShaderDefs::LIGHTMAP_AMBIENT;
    }

    for node in bake_nodes {
        if value {
            for target in &node.render_targets {
                target.color_buffer().set_filter(FilterMode::Linear);
            }
        }

        for &id in &node.mesh_instances {
            let mesh_instance = scene.mesh_instance_mut(id);
            mesh_instance.set_lightmapped(value);
            if value {
                mesh_instance.shader_defs |= defs;
                for pass in BakePass::ALL {
                    let texture = node
                        .render_targets
                        .get(pass.index())
                        .map(|target| target.color_buffer().clone());
                    mesh_instance.set_realtime_lightmap(pass, texture);
                }
            }
        }
    }
}

fn bake_camera() -> Camera {
    let mut camera = Camera::new_orthographic(1.0, 1.0, 0.0, 1.0);
    camera.name = "LightmapperCamera";
    camera.clear_color = Vec4::ZERO;
    camera.clear_color_buffer = true;
    camera.clear_depth_buffer = false;
    camera.frustum_culling = false;
    camera
}

/// Look straight down at `bounds` from its top face
fn frame_directional_camera(camera: &mut Camera, bounds: &Aabb) {
    let center = bounds.center();
    let half = bounds.half_extents();
    camera.position = Vec3::new(center.x, center.y + half.y, center.z);
    camera.set_euler_angles(-90.0, 0.0, 0.0);
    camera.near_plane = 0.0;
    camera.far_plane = half.y * 2.0;
    camera.projection = Projection::Orthographic {
        ortho_height: half.x.max(half.z),
    };
}

fn spot_shadow_camera(light: &Light) -> Camera {
    let mut camera = Camera::new_perspective(
        light.outer_cone_angle * 2.0,
        1.0,
        light.range / 1000.0,
        light.range,
    );
    camera.name = "SpotShadowCamera";
    camera.position = light.position;
    camera.rotation = light.rotation;
    camera.rotate_local(-90.0, 0.0, 0.0);
    camera
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directional_camera_covers_the_casters() {
        let mut camera = bake_camera();
        let bounds = Aabb::new(Vec3::new(-2.0, 0.0, -1.0), Vec3::new(2.0, 6.0, 1.0));
        frame_directional_camera(&mut camera, &bounds);

        assert_eq!(camera.position, Vec3::new(0.0, 6.0, 0.0));
        assert_eq!(camera.near_plane, 0.0);
        assert_eq!(camera.far_plane, 6.0);
        assert_eq!(camera.projection, Projection::Orthographic { ortho_height: 2.0 });
        assert!(camera.forward().abs_diff_eq(Vec3::NEG_Y, 1e-5));
    }

    #[test]
    fn spot_camera_looks_along_the_light() {
        let light = Light::spot("spot", Vec3::new(0.0, 5.0, 0.0), 10.0, 20.0, 30.0);
        let camera = spot_shadow_camera(&light);

        assert!(camera.forward().abs_diff_eq(light.direction(), 1e-5));
        assert_eq!(camera.projection, Projection::Perspective { fov_y: 60.0 });
        assert!((camera.near_plane - 0.01).abs() < 1e-6);
        assert_eq!(camera.far_plane, 10.0);
    }

    #[test]
    fn spot_camera_sees_what_is_below() {
        let light = Light::spot("spot", Vec3::new(0.0, 5.0, 0.0), 10.0, 20.0, 30.0);
        let frustum = Frustum::from_camera(&spot_shadow_camera(&light));
        assert!(frustum.test_sphere(&Sphere::new(Vec3::ZERO, 0.5)));
        assert!(!frustum.test_sphere(&Sphere::new(Vec3::new(0.0, 10.0, 0.0), 0.5)));
    }

    #[test]
    fn bake_camera_keeps_accumulating() {
        let camera = bake_camera();
        assert!(!camera.clear_depth_buffer);
        assert!(!camera.frustum_culling);
        assert_eq!(camera.clear_color, Vec4::ZERO);
    }
}

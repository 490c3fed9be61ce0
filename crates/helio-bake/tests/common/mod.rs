#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use glam::{Vec3, Vec4};
use helio_core::{
    downcast_texture, BakePass, Camera, ComponentKind, FogMode, Light, LightKind, Material,
    Mesh, MeshInstanceId, NodeId, RenderComponent, Scene, Texture,
};
use helio_lighting::LightingParams;
use helio_render_v2::{
    BakeRenderer, Error, ForwardPass, Result, ShaderStats, SoftwareBakeDevice, SoftwareTexture,
};
use helio_bake::Lightmapper;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// One forward draw as the renderer saw it
#[derive(Debug, Clone)]
pub struct ForwardRecord {
    pub target: String,
    pub target_size: u32,
    pub light: String,
    pub light_kind: LightKind,
    pub light_intensity: f32,
    pub material: String,
    pub bake_dir: Option<f32>,
    pub mesh_instances: usize,
    pub fog_mode: FogMode,
    pub ambient_light: Vec3,
    pub clustered: bool,
}

#[derive(Debug, Clone)]
pub struct ShadowRecord {
    pub light: String,
    pub camera: &'static str,
    pub casters: usize,
    pub has_shadow_map: bool,
}

/// Renderer that records what it is asked to draw and accumulates the light
/// intensity into the interior texels of software render targets
#[derive(Default)]
pub struct RecordingRenderer {
    pub forward: Vec<ForwardRecord>,
    pub shadows: Vec<ShadowRecord>,
    pub atlas_updates: Vec<usize>,
    pub scene_constants: Vec<(FogMode, Vec3)>,
    pub shadow_frames: usize,
    pub skinned: Vec<usize>,
    /// Fail every forward draw once this many have succeeded
    pub fail_forward_after: Option<usize>,
    linked: HashSet<String>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_after(draws: usize) -> Self {
        Self {
            fail_forward_after: Some(draws),
            ..Self::default()
        }
    }

    pub fn materials(&self) -> Vec<&str> {
        self.forward.iter().map(|r| r.material.as_str()).collect()
    }

    pub fn lights(&self) -> Vec<&str> {
        self.forward.iter().map(|r| r.light.as_str()).collect()
    }
}

impl BakeRenderer for RecordingRenderer {
    fn shadow_frame_update(&mut self) {
        self.shadow_frames += 1;
    }

    fn set_scene_constants(&mut self, scene: &Scene) {
        self.scene_constants.push((scene.fog.mode, scene.ambient_light));
    }

    fn update_skinning(&mut self, _scene: &Scene, mesh_instances: &[MeshInstanceId]) -> Result<()> {
        self.skinned.push(mesh_instances.len());
        Ok(())
    }

    fn update_light_texture_atlas(&mut self, lights: &[&Light], _params: &LightingParams) {
        self.atlas_updates.push(lights.len());
    }

    fn render_shadows(
        &mut self,
        _scene: &Scene,
        light: &Light,
        camera: &Camera,
        casters: &[MeshInstanceId],
    ) -> Result<Duration> {
        self.shadows.push(ShadowRecord {
            light: light.name.clone(),
            camera: camera.name,
            casters: casters.len(),
            has_shadow_map: light.shadow_map.is_some(),
        });
        Ok(Duration::from_micros(5))
    }

    fn render_forward(&mut self, scene: &Scene, pass: &ForwardPass<'_>) -> Result<Duration> {
        if let Some(limit) = self.fail_forward_after {
            if self.forward.len() >= limit {
                return Err(Error::Pipeline("forward draw failed".to_string()));
            }
        }

        let light = [LightKind::Directional, LightKind::Omni, LightKind::Spot]
            .into_iter()
            .flat_map(|kind| pass.lights.of_kind(kind).iter().copied())
            .next()
            .ok_or_else(|| Error::Pipeline("forward pass without a light".to_string()))?;
        let first = pass
            .mesh_instances
            .first()
            .map(|&id| scene.mesh_instance(id))
            .ok_or_else(|| Error::Pipeline("forward pass without geometry".to_string()))?;

        let material = first.material.name.clone();
        self.linked.insert(material.clone());

        let bake_pass = if pass.bake_dir.is_some() {
            BakePass::Direction
        } else {
            BakePass::Color
        };
        let target = downcast_texture::<SoftwareTexture>(pass.target.color_buffer().as_ref())
            .ok_or_else(|| Error::Resource("target is not a software texture".to_string()))?;
        let size = target.width();
        let previous = first
            .realtime_lightmap(bake_pass)
            .and_then(|t| downcast_texture::<SoftwareTexture>(t.as_ref()))
            .filter(|t| t.width() == size)
            .map(SoftwareTexture::read_texels);

        let contribution = match pass.bake_dir {
            Some(bake_dir) => Vec3::splat(bake_dir),
            None => light.color * light.intensity,
        };
        for y in 0..size {
            for x in 0..size {
                let interior = x > 0 && y > 0 && x + 1 < size && y + 1 < size;
                let value = if interior {
                    let before = previous
                        .as_ref()
                        .map_or(Vec3::ZERO, |texels| texels[(y * size + x) as usize].truncate());
                    (before + contribution).extend(1.0)
                } else {
                    Vec4::ZERO
                };
                target.write_texel(x, y, value);
            }
        }

        self.forward.push(ForwardRecord {
            target: pass.target.name().to_string(),
            target_size: size,
            light: light.name.clone(),
            light_kind: light.kind,
            light_intensity: light.intensity,
            material,
            bake_dir: pass.bake_dir,
            mesh_instances: pass.mesh_instances.len(),
            fog_mode: scene.fog.mode,
            ambient_light: scene.ambient_light,
            clustered: pass.clusters.is_some(),
        });
        Ok(Duration::from_micros(20))
    }

    fn shader_stats(&self) -> ShaderStats {
        ShaderStats {
            linked: self.linked.len() as u32,
            compile_time: Duration::from_micros(self.linked.len() as u64 * 100),
        }
    }
}

pub type TestLightmapper = Lightmapper<SoftwareBakeDevice, RecordingRenderer>;

pub fn lightmapper() -> TestLightmapper {
    init_logging();
    Lightmapper::new(SoftwareBakeDevice::new(), RecordingRenderer::new())
}

/// Add a lightmapped node holding one unit cube (half extent 1) at `position`
pub fn add_cube(scene: &mut Scene, name: &str, position: Vec3) -> (NodeId, MeshInstanceId) {
    let node = scene.add_node(scene.root(), name).unwrap();
    scene.node_mut(node).transform.position = position;
    scene.set_render_component(node, RenderComponent::new(ComponentKind::Render).lightmapped());
    let mesh_instance = scene
        .add_mesh_instance(node, Mesh::cube(name, 1.0), Arc::new(Material::new(name)))
        .unwrap();
    scene.update_world_transforms();
    (node, mesh_instance)
}

/// A unit cube lit by one directional light
pub fn cube_scene() -> (Scene, NodeId, MeshInstanceId) {
    let mut scene = Scene::new();
    let (node, mesh_instance) = add_cube(&mut scene, "cube", Vec3::ZERO);
    scene.add_light(Light::directional("sun").with_cast_shadows(true));
    (scene, node, mesh_instance)
}

/// Texels of a texture created by the software device
pub fn texels(texture: &Arc<dyn Texture>) -> Vec<Vec4> {
    downcast_texture::<SoftwareTexture>(texture.as_ref())
        .map(SoftwareTexture::read_texels)
        .unwrap_or_default()
}

//! Renderer seam used by the lightmapper
//!
//! Baking reuses the application's forward and shadow renderers. Everything
//! the lightmapper needs from them is expressed by `BakeRenderer`.

use std::time::Duration;

use helio_core::{Camera, Light, LightKind, MeshInstanceId, RenderTarget, Scene};
use helio_lighting::{LightingParams, WorldClusters};

use crate::Result;

/// Active lights grouped by type, indexed by `LightKind`
#[derive(Debug, Default)]
pub struct LightArray<'a> {
    lists: [Vec<&'a Light>; 3],
}

impl<'a> LightArray<'a> {
    /// An array holding exactly one light
    pub fn single(light: &'a Light) -> Self {
        let mut array = Self::default();
        array.lists[Self::slot(light.kind)].push(light);
        array
    }

    fn slot(kind: LightKind) -> usize {
        match kind {
            LightKind::Directional => 0,
            LightKind::Omni => 1,
            LightKind::Spot => 2,
        }
    }

    pub fn of_kind(&self, kind: LightKind) -> &[&'a Light] {
        &self.lists[Self::slot(kind)]
    }

    pub fn len(&self) -> usize {
        self.lists.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One forward draw of a bake node into a lightmap render target
pub struct ForwardPass<'a> {
    pub camera: &'a Camera,
    pub target: &'a RenderTarget,
    pub mesh_instances: &'a [MeshInstanceId],
    pub lights: &'a LightArray<'a>,
    /// Direction pass only: 1.0 when the light contributes to the dominant direction
    pub bake_dir: Option<f32>,
    pub clusters: Option<&'a WorldClusters>,
}

/// Shader compilation counters reported by a renderer
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ShaderStats {
    pub linked: u32,
    pub compile_time: Duration,
}

pub trait BakeRenderer {
    /// Start a new shadow frame; cached shadow cameras become stale
    fn shadow_frame_update(&mut self) {}

    /// Upload fog, ambient and other scene-wide constants
    fn set_scene_constants(&mut self, _scene: &Scene) {}

    /// Bring skinned geometry up to date before any pass reads it
    fn update_skinning(&mut self, _scene: &Scene, _mesh_instances: &[MeshInstanceId]) -> Result<()> {
        Ok(())
    }

    /// Regenerate shaders of mesh instances whose material changed
    fn update_shaders(&mut self, scene: &mut Scene, mesh_instances: &[MeshInstanceId]) {
        for &id in mesh_instances {
            scene.mesh_instance_mut(id).clear_shaders();
        }
        scene.update_shaders = false;
    }

    fn update_light_texture_atlas(&mut self, _lights: &[&Light], _params: &LightingParams) {}

    /// Render `light`'s shadow map from `camera`; returns the time spent
    fn render_shadows(
        &mut self,
        scene: &Scene,
        light: &Light,
        camera: &Camera,
        casters: &[MeshInstanceId],
    ) -> Result<Duration>;

    /// Render `pass.mesh_instances` into `pass.target`; returns the time spent
    fn render_forward(&mut self, scene: &Scene, pass: &ForwardPass<'_>) -> Result<Duration>;

    fn shader_stats(&self) -> ShaderStats {
        ShaderStats::default()
    }
}

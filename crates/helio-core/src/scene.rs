//! Scene hierarchy, render components and scene-wide lighting settings.
//!
//! Nodes live in an arena and refer to each other by `NodeId`; mesh instances
//! and lights are owned by the scene and addressed by their own ids.

use glam::{Mat4, UVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{HelioError, Result};
use crate::light::{Light, LightId};
use crate::material::MaterialRef;
use crate::mesh::{MeshInstance, MeshInstanceId, MeshRef};
use crate::texture::TextureFormat;
use crate::transform::Transform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle into an application asset registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId(pub u64);

/// Authored surface-area metadata used to size lightmaps
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightmapArea {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub uv: f32,
}

impl Default for LightmapArea {
    fn default() -> Self {
        Self {
            x: 1.0,
            y: 1.0,
            z: 1.0,
            uv: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Model,
    Render,
}

#[derive(Debug, Clone)]
pub struct RenderComponent {
    pub kind: ComponentKind,
    pub enabled: bool,
    pub lightmapped: bool,
    pub cast_shadows: bool,
    pub cast_shadows_lightmap: bool,
    /// 0 means unset
    pub lightmap_size_multiplier: f32,
    pub area: Option<LightmapArea>,
    pub asset: Option<AssetId>,
    pub mesh_instances: Vec<MeshInstanceId>,
}

impl RenderComponent {
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            enabled: true,
            lightmapped: false,
            cast_shadows: true,
            cast_shadows_lightmap: true,
            lightmap_size_multiplier: 1.0,
            area: None,
            asset: None,
            mesh_instances: Vec::new(),
        }
    }

    pub fn lightmapped(mut self) -> Self {
        self.lightmapped = true;
        self
    }

    pub fn with_area(mut self, area: LightmapArea) -> Self {
        self.area = Some(area);
        self
    }

    pub fn with_asset(mut self, asset: AssetId) -> Self {
        self.asset = Some(asset);
        self
    }

    pub fn with_lightmap_size_multiplier(mut self, multiplier: f32) -> Self {
        self.lightmap_size_multiplier = multiplier;
        self
    }
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub enabled: bool,
    pub transform: Transform,
    pub render: Option<RenderComponent>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    world: Mat4,
}

impl SceneNode {
    fn new(name: impl Into<String>, parent: Option<NodeId>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            transform: Transform::default(),
            render: None,
            parent,
            children: Vec::new(),
            world: Mat4::IDENTITY,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn world_transform(&self) -> Mat4 {
        self.world
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FogMode {
    None,
    Linear,
    Exp,
    Exp2,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fog {
    pub mode: FogMode,
    pub color: Vec3,
    pub density: f32,
    pub start: f32,
    pub end: f32,
}

impl Fog {
    pub fn none() -> Self {
        Self {
            mode: FogMode::None,
            color: Vec3::ZERO,
            density: 0.0,
            start: 1.0,
            end: 1000.0,
        }
    }
}

impl Default for Fog {
    fn default() -> Self {
        Self::none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GammaCorrection {
    None,
    Srgb,
}

impl GammaCorrection {
    pub fn exponent(self) -> f32 {
        match self {
            GammaCorrection::None => 1.0,
            GammaCorrection::Srgb => 2.2,
        }
    }
}

/// Scene-level lightmap configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightmapSettings {
    /// Texels per unit of authored area; 0 means the default of 16
    pub size_multiplier: f32,
    /// 0 means the default of 2048
    pub max_resolution: u32,
    pub pixel_format: TextureFormat,
    pub filter_enabled: bool,
    pub filter_range: u32,
    pub filter_smoothness: f32,
    pub ambient_bake: bool,
    pub ambient_bake_num_samples: u32,
    /// Fraction of the sphere sampled for ambient occlusion, 0.5 is a hemisphere
    pub ambient_bake_sphere_part: f32,
    pub ambient_bake_occlusion_brightness: f32,
    pub ambient_bake_occlusion_contrast: f32,
}

impl Default for LightmapSettings {
    fn default() -> Self {
        Self {
            size_multiplier: 16.0,
            max_resolution: 2048,
            pixel_format: TextureFormat::Rgba8Unorm,
            filter_enabled: false,
            filter_range: 10,
            filter_smoothness: 0.2,
            ambient_bake: false,
            ambient_bake_num_samples: 1,
            ambient_bake_sphere_part: 0.4,
            ambient_bake_occlusion_brightness: 0.0,
            ambient_bake_occlusion_contrast: 0.0,
        }
    }
}

/// Clustered lighting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingSettings {
    pub shadows_enabled: bool,
    pub cookies_enabled: bool,
    pub cells: UVec3,
    pub max_lights_per_cell: u32,
    pub shadow_atlas_resolution: u32,
    pub cookie_atlas_resolution: u32,
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            shadows_enabled: true,
            cookies_enabled: false,
            cells: UVec3::new(10, 3, 10),
            max_lights_per_cell: 255,
            shadow_atlas_resolution: 2048,
            cookie_atlas_resolution: 2048,
        }
    }
}

#[derive(Debug)]
pub struct Scene {
    nodes: Vec<SceneNode>,
    mesh_instances: Vec<MeshInstance>,
    lights: Vec<Light>,
    pub fog: Fog,
    pub ambient_light: Vec3,
    pub gamma_correction: GammaCorrection,
    pub lightmap: LightmapSettings,
    pub clustered_lighting_enabled: bool,
    pub lighting: LightingSettings,
    pub static_batching: bool,
    /// Set when mesh instance shaders need regenerating before the next draw
    pub update_shaders: bool,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            nodes: vec![SceneNode::new("root", None)],
            mesh_instances: Vec::new(),
            lights: Vec::new(),
            fog: Fog::none(),
            ambient_light: Vec3::ZERO,
            gamma_correction: GammaCorrection::Srgb,
            lightmap: LightmapSettings::default(),
            clustered_lighting_enabled: false,
            lighting: LightingSettings::default(),
            static_batching: false,
            update_shaders: false,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    // ── Nodes ─────────────────────────────────────────────────────────────

    pub fn add_node(&mut self, parent: NodeId, name: impl Into<String>) -> Result<NodeId> {
        if parent.0 >= self.nodes.len() {
            return Err(HelioError::InvalidHierarchy(format!(
                "parent node {} does not exist",
                parent.0
            )));
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(SceneNode::new(name, Some(parent)));
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SceneNode {
        &mut self.nodes[id.0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn set_render_component(&mut self, node: NodeId, component: RenderComponent) {
        self.nodes[node.0].render = Some(component);
    }

    pub fn render_component(&self, node: NodeId) -> Option<&RenderComponent> {
        self.nodes[node.0].render.as_ref()
    }

    pub fn render_component_mut(&mut self, node: NodeId) -> Option<&mut RenderComponent> {
        self.nodes[node.0].render.as_mut()
    }

    // ── Mesh instances ────────────────────────────────────────────────────

    /// Attach a new mesh instance to the node's render component.
    pub fn add_mesh_instance(
        &mut self,
        node: NodeId,
        mesh: MeshRef,
        material: MaterialRef,
    ) -> Result<MeshInstanceId> {
        let id = MeshInstanceId(self.mesh_instances.len());
        let component = self
            .nodes
            .get_mut(node.0)
            .and_then(|n| n.render.as_mut())
            .ok_or_else(|| {
                HelioError::ResourceNotFound(format!("node {} has no render component", node.0))
            })?;
        component.mesh_instances.push(id);
        self.mesh_instances.push(MeshInstance::new(node, mesh, material));
        Ok(id)
    }

    pub fn mesh_instance(&self, id: MeshInstanceId) -> &MeshInstance {
        &self.mesh_instances[id.0]
    }

    pub fn mesh_instance_mut(&mut self, id: MeshInstanceId) -> &mut MeshInstance {
        &mut self.mesh_instances[id.0]
    }

    pub fn mesh_instances(&self) -> &[MeshInstance] {
        &self.mesh_instances
    }

    // ── Lights ────────────────────────────────────────────────────────────

    pub fn add_light(&mut self, light: Light) -> LightId {
        let id = LightId(self.lights.len());
        self.lights.push(light);
        id
    }

    pub fn light(&self, id: LightId) -> &Light {
        &self.lights[id.0]
    }

    pub fn light_mut(&mut self, id: LightId) -> &mut Light {
        &mut self.lights[id.0]
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn light_ids(&self) -> impl Iterator<Item = LightId> {
        (0..self.lights.len()).map(LightId)
    }

    // ── Transforms ────────────────────────────────────────────────────────

    /// Recompute world matrices for the whole hierarchy and refresh the
    /// world-space bounds of every mesh instance.
    pub fn update_world_transforms(&mut self) {
        let mut stack = vec![(self.root(), Mat4::IDENTITY)];
        while let Some((id, parent_world)) = stack.pop() {
            let node = &mut self.nodes[id.0];
            node.world = parent_world * node.transform.to_matrix();
            let world = node.world;
            stack.extend(node.children.iter().map(|&child| (child, world)));
        }

        for instance in &mut self.mesh_instances {
            let world = self.nodes[instance.node.0].world;
            instance.aabb = instance.mesh.aabb.transform(&world);
        }
        log::trace!(
            "Updated world transforms for {} nodes, {} mesh instances",
            self.nodes.len(),
            self.mesh_instances.len()
        );
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use crate::mesh::Mesh;
    use std::sync::Arc;

    #[test]
    fn world_bounds_follow_the_hierarchy() {
        let mut scene = Scene::new();
        let parent = scene.add_node(scene.root(), "parent").unwrap();
        scene.node_mut(parent).transform = Transform::from_position(Vec3::new(10.0, 0.0, 0.0));
        let child = scene.add_node(parent, "child").unwrap();
        scene.node_mut(child).transform = Transform::from_position(Vec3::new(0.0, 5.0, 0.0));
        scene.set_render_component(child, RenderComponent::new(ComponentKind::Render));
        let mi = scene
            .add_mesh_instance(child, Mesh::cube("cube", 1.0), Arc::new(Material::new("m")))
            .unwrap();

        scene.update_world_transforms();

        let aabb = scene.mesh_instance(mi).aabb;
        assert!(aabb.center().abs_diff_eq(Vec3::new(10.0, 5.0, 0.0), 1e-5));
        assert!(aabb.half_extents().abs_diff_eq(Vec3::ONE, 1e-5));
    }

    #[test]
    fn mesh_instances_need_a_render_component() {
        let mut scene = Scene::new();
        let node = scene.add_node(scene.root(), "bare").unwrap();
        let result = scene.add_mesh_instance(node, Mesh::cube("cube", 1.0), Arc::new(Material::new("m")));
        assert!(matches!(result, Err(HelioError::ResourceNotFound(_))));
    }

    #[test]
    fn lightmap_defaults() {
        let settings = LightmapSettings::default();
        assert_eq!(settings.size_multiplier, 16.0);
        assert_eq!(settings.max_resolution, 2048);
        assert_eq!(settings.pixel_format, TextureFormat::Rgba8Unorm);
        assert!(!settings.ambient_bake);
    }
}

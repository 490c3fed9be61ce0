//! Units of geometry baked into one lightmap atlas

use helio_core::{Aabb, MeshInstanceId, NodeId, RenderTarget, Scene};

/// One or more mesh instances of a scene node sharing a UV1 atlas.
///
/// `render_targets` holds one accumulation target per bake pass while a bake
/// is running and is emptied when it finishes.
#[derive(Debug)]
pub struct BakeNode {
    pub node: NodeId,
    pub mesh_instances: Vec<MeshInstanceId>,
    pub bounds: Aabb,
    pub render_targets: Vec<RenderTarget>,
    cast_shadows: bool,
}

impl BakeNode {
    /// All mesh instances of the node's render component
    pub fn whole(scene: &Scene, node: NodeId) -> Self {
        let mesh_instances = scene
            .render_component(node)
            .map(|component| component.mesh_instances.clone())
            .unwrap_or_default();
        Self::with_mesh_instances(scene, node, mesh_instances)
    }

    pub fn with_mesh_instances(
        scene: &Scene,
        node: NodeId,
        mesh_instances: Vec<MeshInstanceId>,
    ) -> Self {
        let cast_shadows = scene
            .render_component(node)
            .map_or(false, |component| component.cast_shadows);
        Self {
            node,
            mesh_instances,
            bounds: Aabb::default(),
            render_targets: Vec::new(),
            cast_shadows,
        }
    }

    pub fn compute_bounds(&mut self, scene: &Scene) {
        self.bounds = mesh_instance_bounds(scene, &self.mesh_instances);
    }

    /// Reinstate component state changed while baking
    pub fn restore(&self, scene: &mut Scene) {
        if let Some(component) = scene.render_component_mut(self.node) {
            component.cast_shadows = self.cast_shadows;
        }
    }
}

/// Union of the world bounds of `mesh_instances`
pub fn mesh_instance_bounds(scene: &Scene, mesh_instances: &[MeshInstanceId]) -> Aabb {
    Aabb::union_all(mesh_instances.iter().map(|&id| &scene.mesh_instance(id).aabb))
}

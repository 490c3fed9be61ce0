//! Scene traversal collecting what to bake and what casts shadows

use std::collections::HashMap;

use helio_core::{MeshInstanceId, NodeId, Scene};

use crate::bake_node::BakeNode;

/// Walk the subtree at `node` depth first.
///
/// Nodes with an enabled render component land in `all_nodes`. Lightmapped
/// ones are split into `bake_nodes`: every instance of a mesh used more than
/// once on the node gets its own bake node, the rest are grouped. Disabled
/// nodes are skipped together with their subtree.
pub fn collect_models(
    scene: &Scene,
    node: NodeId,
    mut bake_nodes: Option<&mut Vec<BakeNode>>,
    mut all_nodes: Option<&mut Vec<BakeNode>>,
) {
    let scene_node = scene.node(node);
    if !scene_node.enabled {
        return;
    }

    if let Some(component) = scene_node.render.as_ref().filter(|c| c.enabled) {
        if let Some(all_nodes) = all_nodes.as_deref_mut() {
            all_nodes.push(BakeNode::whole(scene, node));
        }
        if component.lightmapped {
            if let Some(bake_nodes) = bake_nodes.as_deref_mut() {
                add_bake_nodes(scene, node, &component.mesh_instances, bake_nodes);
            }
        }
    }

    for &child in scene_node.children() {
        collect_models(scene, child, bake_nodes.as_deref_mut(), all_nodes.as_deref_mut());
    }
}

fn add_bake_nodes(
    scene: &Scene,
    node: NodeId,
    mesh_instances: &[MeshInstanceId],
    bake_nodes: &mut Vec<BakeNode>,
) {
    let has_uv1 = mesh_instances
        .iter()
        .all(|&id| scene.mesh_instance(id).mesh.has_uv1());
    if !has_uv1 {
        log::warn!(
            "node [{}] contains meshes without required uv1, excluding it from baking",
            scene.node(node).name
        );
        return;
    }

    let mut uses = HashMap::new();
    for &id in mesh_instances {
        *uses.entry(scene.mesh_instance(id).mesh.id()).or_insert(0usize) += 1;
    }

    let mut not_instanced = Vec::new();
    for &id in mesh_instances {
        if uses[&scene.mesh_instance(id).mesh.id()] > 1 {
            bake_nodes.push(BakeNode::with_mesh_instances(scene, node, vec![id]));
        } else {
            not_instanced.push(id);
        }
    }

    if !not_instanced.is_empty() {
        bake_nodes.push(BakeNode::with_mesh_instances(scene, node, not_instanced));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use helio_core::{
        Aabb, ComponentKind, Material, Mesh, MeshRef, RenderComponent, VertexFormat,
    };

    fn scene_with_node(lightmapped: bool) -> (Scene, NodeId) {
        let mut scene = Scene::new();
        let node = scene.add_node(scene.root(), "model").unwrap();
        let mut component = RenderComponent::new(ComponentKind::Render);
        if lightmapped {
            component = component.lightmapped();
        }
        scene.set_render_component(node, component);
        (scene, node)
    }

    fn add(scene: &mut Scene, node: NodeId, mesh: &MeshRef) -> MeshInstanceId {
        let material = Arc::new(Material::new("default"));
        scene.add_mesh_instance(node, mesh.clone(), material).unwrap()
    }

    #[test]
    fn shared_meshes_are_split_out() {
        let (mut scene, node) = scene_with_node(true);
        let shared = Mesh::cube("shared", 1.0);
        let a = Mesh::cube("a", 1.0);
        let b = Mesh::cube("b", 1.0);
        let first = add(&mut scene, node, &shared);
        let other_a = add(&mut scene, node, &a);
        let second = add(&mut scene, node, &shared);
        let other_b = add(&mut scene, node, &b);
        let third = add(&mut scene, node, &shared);

        let mut bake_nodes = Vec::new();
        collect_models(&scene, scene.root(), Some(&mut bake_nodes), None);

        let groups: Vec<_> = bake_nodes.iter().map(|n| n.mesh_instances.clone()).collect();
        assert_eq!(
            groups,
            vec![vec![first], vec![second], vec![third], vec![other_a, other_b]]
        );
    }

    #[test]
    fn only_shared_meshes_give_one_node_each() {
        let (mut scene, node) = scene_with_node(true);
        let shared = Mesh::cube("shared", 1.0);
        add(&mut scene, node, &shared);
        add(&mut scene, node, &shared);

        let mut bake_nodes = Vec::new();
        collect_models(&scene, scene.root(), Some(&mut bake_nodes), None);
        assert_eq!(bake_nodes.len(), 2);
    }

    #[test]
    fn missing_uv1_excludes_the_node_from_baking_only() {
        let (mut scene, node) = scene_with_node(true);
        let format = VertexFormat {
            has_uv1: false,
            ..VertexFormat::default()
        };
        let mesh = Arc::new(Mesh::new("no_uv1", format, Aabb::default()));
        add(&mut scene, node, &Mesh::cube("fine", 1.0));
        add(&mut scene, node, &mesh);

        let mut bake_nodes = Vec::new();
        let mut all_nodes = Vec::new();
        collect_models(&scene, scene.root(), Some(&mut bake_nodes), Some(&mut all_nodes));
        assert!(bake_nodes.is_empty());
        assert_eq!(all_nodes.len(), 1);
        assert_eq!(all_nodes[0].node, node);
    }

    #[test]
    fn disabled_subtrees_are_skipped() {
        let (mut scene, node) = scene_with_node(true);
        add(&mut scene, node, &Mesh::cube("cube", 1.0));
        let child = scene.add_node(node, "child").unwrap();
        scene.set_render_component(child, RenderComponent::new(ComponentKind::Model).lightmapped());
        add(&mut scene, child, &Mesh::cube("child", 1.0));
        scene.node_mut(node).enabled = false;

        let mut bake_nodes = Vec::new();
        let mut all_nodes = Vec::new();
        collect_models(&scene, scene.root(), Some(&mut bake_nodes), Some(&mut all_nodes));
        assert!(bake_nodes.is_empty());
        assert!(all_nodes.is_empty());
    }

    #[test]
    fn non_lightmapped_nodes_still_cast() {
        let (mut scene, node) = scene_with_node(false);
        add(&mut scene, node, &Mesh::cube("cube", 1.0));

        let mut bake_nodes = Vec::new();
        let mut all_nodes = Vec::new();
        collect_models(&scene, scene.root(), Some(&mut bake_nodes), Some(&mut all_nodes));
        assert!(bake_nodes.is_empty());
        assert_eq!(all_nodes.len(), 1);
    }
}

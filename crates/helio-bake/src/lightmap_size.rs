//! Lightmap resolution from node surface area

use std::collections::HashMap;

use helio_core::{AssetId, LightmapArea, NodeId, Scene};

use crate::bake_node::mesh_instance_bounds;

/// Texels per unit when the scene leaves `size_multiplier` at 0
pub const DEFAULT_SIZE_MULTIPLIER: f32 = 16.0;

/// Upper bound for any lightmap edge
pub const MAX_LIGHTMAP_SIZE: u32 = 2048;

/// Source of authored lightmap area for model assets
pub trait AssetRegistry {
    fn lightmap_area(&self, asset: AssetId) -> Option<LightmapArea>;
}

impl AssetRegistry for HashMap<AssetId, LightmapArea> {
    fn lightmap_area(&self, asset: AssetId) -> Option<LightmapArea> {
        self.get(&asset).copied()
    }
}

/// No asset metadata; every node uses its inline area or the default
impl AssetRegistry for () {
    fn lightmap_area(&self, _asset: AssetId) -> Option<LightmapArea> {
        None
    }
}

/// Smallest power of two not below the integer part of `value`, at least 1
pub fn next_power_of_two(value: f32) -> u32 {
    // float to int casts saturate and map NaN to 0
    let truncated = (value as u32).clamp(1, 1 << 31);
    truncated.next_power_of_two()
}

/// Largest power of two not above `min(2048, max_resolution)`; 0 means 2048
pub fn resolution_cap(max_resolution: u32) -> u32 {
    let max = if max_resolution == 0 {
        MAX_LIGHTMAP_SIZE
    } else {
        max_resolution.min(MAX_LIGHTMAP_SIZE)
    };
    1 << (31 - max.leading_zeros())
}

/// Edge length of the square lightmap for `node`.
///
/// The surface area is estimated from the half extents of the node's mesh
/// instances, weighted per axis by the authored area, and scaled by the
/// scene's texels-per-unit multiplier.
pub fn calculate_lightmap_size(scene: &Scene, node: NodeId, assets: &dyn AssetRegistry) -> u32 {
    let size_mult = if scene.lightmap.size_multiplier > 0.0 {
        scene.lightmap.size_multiplier
    } else {
        DEFAULT_SIZE_MULTIPLIER
    };

    let component = scene.render_component(node);
    let mut area = component
        .and_then(|c| c.area.or_else(|| c.asset.and_then(|asset| assets.lightmap_area(asset))))
        .unwrap_or_default();

    let area_mult = component
        .map(|c| c.lightmap_size_multiplier)
        .filter(|&m| m > 0.0)
        .unwrap_or(1.0);
    area.x *= area_mult;
    area.y *= area_mult;
    area.z *= area_mult;

    let mesh_instances = component.map(|c| c.mesh_instances.as_slice()).unwrap_or(&[]);
    let scale = mesh_instance_bounds(scene, mesh_instances).half_extents();

    let mut total_area =
        area.x * scale.y * scale.z + area.y * scale.x * scale.z + area.z * scale.x * scale.y;
    total_area /= area.uv;
    let total_area = total_area.sqrt();

    next_power_of_two(total_area * size_mult).min(resolution_cap(scene.lightmap.max_resolution))
}

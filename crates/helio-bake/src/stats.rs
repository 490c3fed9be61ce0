use std::time::Duration;

/// Counters of the most recent bake
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BakeStats {
    /// Forward passes rendered into lightmaps
    pub render_passes: u32,
    /// Bake nodes that received lightmaps
    pub lightmap_count: usize,
    pub total_render_time: Duration,
    pub forward_time: Duration,
    /// Time spent allocating lightmaps and their render targets
    pub fbo_time: Duration,
    pub shadow_map_time: Duration,
    pub compile_time: Duration,
    pub shaders_linked: u32,
}

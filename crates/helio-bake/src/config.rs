//! Lightmapper configuration

use helio_lighting::VirtualLightSampling;
use serde::{Deserialize, Serialize};

/// Which accumulation passes a bake runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BakeMode {
    /// Diffuse color only
    ColorOnly,
    /// Diffuse color plus the dominant light direction
    #[default]
    ColorPlusDirection,
}

impl BakeMode {
    pub fn pass_count(self) -> usize {
        match self {
            BakeMode::ColorOnly => 1,
            BakeMode::ColorPlusDirection => 2,
        }
    }
}

/// Settings owned by the lightmapper itself. Per-scene settings live in
/// `helio_core::LightmapSettings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightmapperConfig {
    /// Distribution of virtual light samples for soft lights and ambient occlusion
    pub virtual_light_sampling: VirtualLightSampling,
    /// Lightmap to scratch to lightmap filter round trips after baking
    pub dilate_iterations: u32,
}

impl Default for LightmapperConfig {
    fn default() -> Self {
        Self {
            virtual_light_sampling: VirtualLightSampling::GoldenSpiral,
            dilate_iterations: 1,
        }
    }
}

impl LightmapperConfig {
    pub fn with_virtual_light_sampling(mut self, sampling: VirtualLightSampling) -> Self {
        self.virtual_light_sampling = sampling;
        self
    }

    pub fn with_dilate_iterations(mut self, iterations: u32) -> Self {
        self.dilate_iterations = iterations;
        self
    }
}

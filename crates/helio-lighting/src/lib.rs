pub mod clustered;
pub mod sampling;
pub mod shadows;

pub use clustered::{LightingParams, WorldClusters};
pub use sampling::{
    circle_point_deterministic, sphere_point_deterministic, VirtualLightSampling, GOLDEN_ANGLE,
};
pub use shadows::{ShadowMapCache, ShadowMapKey};

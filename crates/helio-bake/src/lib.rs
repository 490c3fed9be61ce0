//! Helio Bake - runtime lightmap baking
//!
//! Renders the direct lighting of a scene into per-node UV1 lightmaps:
//!
//! - Scene collection splits lightmapped nodes into bake nodes and gathers
//!   shadow casters
//! - Lights are baked one at a time, soft lights and ambient occlusion as
//!   several virtual lights
//! - Each pass accumulates into pooled render targets that are swapped with
//!   the node's lightmap
//! - Finished lightmaps are dilated, optionally denoised, and bound to the
//!   scene's mesh instances
//!
//! GPU work goes through `helio_render_v2::BakeDevice` and the application's
//! renderer through `helio_render_v2::BakeRenderer`.

pub mod bake_light;
pub mod bake_node;
pub mod collect;
pub mod config;
pub mod error;
pub mod lightmap_size;
pub mod lightmapper;
pub mod scene_state;
pub mod stats;

pub use bake_light::{prepare_lights_to_bake, BakeLight, PreparedLights, StoredLightState};
pub use bake_node::BakeNode;
pub use collect::collect_models;
pub use config::{BakeMode, LightmapperConfig};
pub use error::{BakeError, Result};
pub use lightmap_size::{calculate_lightmap_size, AssetRegistry, MAX_LIGHTMAP_SIZE};
pub use lightmapper::{BakeOutcome, Lightmapper};
pub use scene_state::{SceneSnapshot, SceneStateGuard};
pub use stats::BakeStats;

//! WGSL sources used while baking
//!
//! The bake chunks are not complete modules. They are spliced into the
//! renderer's forward shader through `Material::chunks`, and their overrides
//! are declared by `pipeline::apply_defines`.

pub const RGBM: &str = include_str!("rgbm.wgsl");
pub const UV1_LAYOUT: &str = include_str!("uv1_layout.wgsl");
pub const BAKE_LM_END: &str = include_str!("bake_lm_end.wgsl");
pub const BAKE_DIR_LM_END: &str = include_str!("bake_dir_lm_end.wgsl");
pub const LIGHTMAP_FILTERS: &str = include_str!("lightmap_filters.wgsl");

/// Complete module for the dilate and denoise pipelines
pub fn lightmap_filters_source() -> String {
    format!("{}\n{}", RGBM, LIGHTMAP_FILTERS)
}

/// End chunk of the color pass with its RGBM dependency
pub fn bake_lm_end_source() -> String {
    format!("{}\n{}", RGBM, BAKE_LM_END)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_module_carries_both_entry_points() {
        let source = lightmap_filters_source();
        assert!(source.contains("fn decode_rgbm"));
        assert!(source.contains("fn fs_dilate"));
        assert!(source.contains("fn fs_denoise"));
        assert!(source.contains("fn vs_fullscreen"));
    }
}

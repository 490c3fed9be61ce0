/// Bake material cache with one variant per pass and ambient mode

use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec3;
use helio_core::{
    BakePass, CullMode, Material, MaterialRef, ShaderChunk, ShaderDefine, TextureFormat,
    TextureRef,
};

use super::{BakeMaterialKey, BakeMaterialSettings};
use crate::shaders;

/// Prepend WGSL `override` declarations for `defines` to `source`
pub fn apply_defines(source: &str, defines: &HashMap<String, ShaderDefine>) -> String {
    let mut result = String::new();

    // Sorted so equal define sets always produce the same module
    let mut names: Vec<&String> = defines.keys().collect();
    names.sort();

    for name in names {
        match &defines[name] {
            ShaderDefine::Bool(b) => {
                result.push_str(&format!("override {}: bool = {};\n", name, b));
            }
            ShaderDefine::U32(u) => {
                result.push_str(&format!("override {}: u32 = {}u;\n", name, u));
            }
            ShaderDefine::F32(f) => {
                result.push_str(&format!("override {}: f32 = {:?};\n", name, f));
            }
        }
    }

    result.push_str(source);
    result
}

/// Bake materials shared by every node and light of one bake
#[derive(Debug, Default)]
pub struct BakeMaterialCache {
    materials: HashMap<BakeMaterialKey, MaterialRef>,
}

impl BakeMaterialCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the material variant for `key`
    pub fn get_or_create(
        &mut self,
        key: BakeMaterialKey,
        settings: &BakeMaterialSettings,
        black: &TextureRef,
    ) -> MaterialRef {
        if let Some(material) = self.materials.get(&key) {
            log::trace!("Using cached bake material: {:?}", key);
            return material.clone();
        }

        log::info!("Creating bake material variant: {:?}", key);
        let material = Arc::new(create_material_for_pass(key, settings, black));
        self.materials.insert(key, material.clone());
        material
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn clear(&mut self) {
        self.materials.clear();
    }
}

fn create_material_for_pass(
    key: BakeMaterialKey,
    settings: &BakeMaterialSettings,
    black: &TextureRef,
) -> Material {
    let mut material = Material::new(format!(
        "lmMaterial-pass:{}-ambient:{}",
        key.pass.index(),
        key.ambient_ao
    ));

    material.define("UV1_LAYOUT", ShaderDefine::Bool(true));
    material.chunks.insert(ShaderChunk::Transform, shaders::UV1_LAYOUT.to_string());

    match key.pass {
        BakePass::Color => {
            material.define("BAKE_AMBIENT_AO", ShaderDefine::Bool(key.ambient_ao));
            material.define("AO_CONTRAST", ShaderDefine::F32(settings.ao_contrast));
            material.define("AO_BRIGHTNESS", ShaderDefine::F32(settings.ao_brightness));
            material.define(
                "LIGHTMAP_RGBM",
                ShaderDefine::Bool(settings.pixel_format == TextureFormat::Rgba8Unorm),
            );
            material.chunks.insert(ShaderChunk::End, shaders::bake_lm_end_source());

            if !key.ambient_ao {
                // only the occlusion variant may pick up scene ambient
                material.ambient = Vec3::ZERO;
                material.ambient_tint = true;
            }
            material.light_map = Some(black.clone());
        }
        BakePass::Direction => {
            material.chunks.insert(ShaderChunk::End, shaders::BAKE_DIR_LM_END.to_string());
        }
    }

    material.write_alpha = false;
    material.cull = CullMode::None;
    material.force_uv1 = true;
    material
}

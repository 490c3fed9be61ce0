//! Lightmap post-process filters
//!
//! `LightmapFilters` evaluates the uniforms shared by the dilate and bilateral
//! denoise shaders. The CPU functions below are the reference implementation
//! of those shaders; the software backend runs them directly.

use glam::{Vec2, Vec3, Vec4};
use helio_core::TextureEncoding;

use crate::encoding::{decode_rgbm, encode_rgbm};

/// Taps of the denoise kernel, matching `MSIZE` in the shader
pub const DENOISE_KERNEL_SIZE: usize = 15;

const KERNEL_HALF: usize = (DENOISE_KERNEL_SIZE - 1) / 2;

/// Neighbour order used by dilation; the first written neighbour wins
const DILATE_OFFSETS: [(f32, f32); 8] = [
    (-1.0, -1.0),
    (0.0, -1.0),
    (1.0, -1.0),
    (-1.0, 0.0),
    (1.0, 0.0),
    (-1.0, 1.0),
    (0.0, 1.0),
    (1.0, 1.0),
];

#[derive(Debug, Clone, PartialEq)]
pub struct FilterUniforms {
    /// Size of one texel in UV space
    pub pixel_offset: [f32; 2],
    /// Spatial sigma and range (similarity) sigma
    pub sigmas: [f32; 2],
    pub kernel: [f32; DENOISE_KERNEL_SIZE],
    pub bz_norm: f32,
    pub rgbm: bool,
}

#[derive(Debug, Clone)]
pub struct LightmapFilters {
    pixel_offset: [f32; 2],
    sigmas: [f32; 2],
    kernel: [f32; DENOISE_KERNEL_SIZE],
    bz_norm: f32,
    rgbm: bool,
}

fn normpdf(x: f32, sigma: f32) -> f32 {
    0.39894 * (-0.5 * x * x / (sigma * sigma)).exp() / sigma
}

impl LightmapFilters {
    pub fn new() -> Self {
        Self {
            pixel_offset: [0.0; 2],
            sigmas: [1.0, 1.0],
            kernel: [0.0; DENOISE_KERNEL_SIZE],
            bz_norm: 1.0,
            rgbm: true,
        }
    }

    /// Set up for filtering a texture of the given size and encoding
    pub fn prepare(&mut self, width: u32, height: u32, encoding: TextureEncoding) {
        self.pixel_offset = [1.0 / width.max(1) as f32, 1.0 / height.max(1) as f32];
        self.rgbm = encoding == TextureEncoding::Rgbm;
    }

    /// Evaluate the spatial kernel for `filter_range` texels and the range
    /// normalisation for `filter_smoothness`.
    pub fn prepare_denoise(&mut self, filter_range: u32, filter_smoothness: f32) {
        let range = filter_range.max(1) as f32;
        let smoothness = filter_smoothness.max(f32::EPSILON);
        self.sigmas = [range, smoothness];

        for j in 0..=KERNEL_HALF {
            let weight = normpdf(j as f32, range);
            self.kernel[KERNEL_HALF + j] = weight;
            self.kernel[KERNEL_HALF - j] = weight;
        }

        self.bz_norm = 1.0 / normpdf(0.0, smoothness);
        log::debug!(
            "Denoise prepared: range {}, smoothness {}",
            filter_range,
            filter_smoothness
        );
    }

    pub fn uniforms(&self) -> FilterUniforms {
        FilterUniforms {
            pixel_offset: self.pixel_offset,
            sigmas: self.sigmas,
            kernel: self.kernel,
            bz_norm: self.bz_norm,
            rgbm: self.rgbm,
        }
    }
}

impl Default for LightmapFilters {
    fn default() -> Self {
        Self::new()
    }
}

// ── CPU reference ──────────────────────────────────────────────────────────────

fn sample(source: &[Vec4], width: u32, height: u32, uv: Vec2) -> Vec4 {
    let x = ((uv.x * width as f32).floor() as i64).clamp(0, width as i64 - 1) as usize;
    let y = ((uv.y * height as f32).floor() as i64).clamp(0, height as i64 - 1) as usize;
    source[y * width as usize + x]
}

fn texel_uv(x: u32, y: u32, width: u32, height: u32) -> Vec2 {
    Vec2::new(
        (x as f32 + 0.5) / width as f32,
        (y as f32 + 0.5) / height as f32,
    )
}

pub fn dilate(source: &[Vec4], width: u32, height: u32, uniforms: &FilterUniforms) -> Vec<Vec4> {
    let offset = Vec2::from(uniforms.pixel_offset);
    let mut out = Vec::with_capacity(source.len());
    for y in 0..height {
        for x in 0..width {
            let uv = texel_uv(x, y, width, height);
            let mut c = sample(source, width, height, uv);
            for (dx, dy) in DILATE_OFFSETS {
                if c.w > 0.0 {
                    break;
                }
                c = sample(source, width, height, uv + Vec2::new(dx, dy) * offset);
            }
            out.push(c);
        }
    }
    out
}

fn normpdf3(v: Vec3, sigma: f32) -> f32 {
    0.39894 * (-0.5 * v.dot(v) / (sigma * sigma)).exp() / sigma
}

pub fn bilateral_denoise(
    source: &[Vec4],
    width: u32,
    height: u32,
    uniforms: &FilterUniforms,
) -> Vec<Vec4> {
    let offset = Vec2::from(uniforms.pixel_offset);
    let decode = |c: Vec4| if uniforms.rgbm { decode_rgbm(c) } else { c.truncate() };
    let encode = |c: Vec3| if uniforms.rgbm { encode_rgbm(c) } else { c.extend(1.0) };
    let k = KERNEL_HALF as i32;

    let mut out = Vec::with_capacity(source.len());
    for y in 0..height {
        for x in 0..width {
            let uv = texel_uv(x, y, width, height);
            let pixel = sample(source, width, height, uv);
            // unwritten texels stay empty so a following dilate still sees them
            if pixel.w <= 0.0 {
                out.push(pixel);
                continue;
            }

            let pixel_hdr = decode(pixel);
            let mut accumulated = Vec3::ZERO;
            let mut factor_sum = 0.0;
            for i in -k..=k {
                for j in -k..=k {
                    let c = sample(
                        source,
                        width,
                        height,
                        uv + Vec2::new(i as f32, j as f32) * offset,
                    );
                    if c.w > 0.0 {
                        let hdr = decode(c);
                        let factor = uniforms.kernel[(k + j) as usize]
                            * uniforms.kernel[(k + i) as usize]
                            * normpdf3(hdr - pixel_hdr, uniforms.sigmas[1])
                            * uniforms.bz_norm;
                        accumulated += factor * hdr;
                        factor_sum += factor;
                    }
                }
            }
            out.push(if factor_sum > 0.0 {
                encode(accumulated / factor_sum)
            } else {
                pixel
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared(width: u32, height: u32) -> FilterUniforms {
        let mut filters = LightmapFilters::new();
        filters.prepare(width, height, TextureEncoding::Linear);
        filters.prepare_denoise(10, 0.2);
        filters.uniforms()
    }

    #[test]
    fn kernel_is_symmetric_and_peaks_in_the_middle() {
        let uniforms = prepared(4, 4);
        for j in 0..=KERNEL_HALF {
            assert_eq!(uniforms.kernel[KERNEL_HALF + j], uniforms.kernel[KERNEL_HALF - j]);
        }
        assert!(uniforms.kernel[KERNEL_HALF] > uniforms.kernel[KERNEL_HALF + 1]);
    }

    #[test]
    fn kernel_covers_every_tap() {
        let mut filters = LightmapFilters::new();
        filters.prepare_denoise(3, 0.2);
        let uniforms = filters.uniforms();
        assert!(uniforms.kernel.iter().all(|&w| w > 0.0));
        assert!((uniforms.kernel[0] - normpdf(KERNEL_HALF as f32, 3.0)).abs() < 1e-7);
        assert!((uniforms.kernel[KERNEL_HALF] - normpdf(0.0, 3.0)).abs() < 1e-7);
    }

    #[test]
    fn dilate_fills_neighbours_of_a_written_texel() {
        let mut source = vec![Vec4::ZERO; 9];
        source[4] = Vec4::new(1.0, 0.5, 0.25, 1.0);
        let out = dilate(&source, 3, 3, &prepared(3, 3));
        assert!(out.iter().all(|c| *c == source[4]));
    }

    #[test]
    fn dilate_keeps_written_texels() {
        let mut source = vec![Vec4::ZERO; 4];
        source[0] = Vec4::new(1.0, 0.0, 0.0, 1.0);
        source[3] = Vec4::new(0.0, 1.0, 0.0, 1.0);
        let out = dilate(&source, 2, 2, &prepared(2, 2));
        assert_eq!(out[0], source[0]);
        assert_eq!(out[3], source[3]);
        // (1,0) tries (-1,-1) first, which clamps onto (0,0)
        assert_eq!(out[1], source[0]);
    }

    #[test]
    fn denoise_leaves_flat_regions_and_holes_alone() {
        let mut source = vec![Vec4::new(0.5, 0.5, 0.5, 1.0); 16];
        source[5] = Vec4::ZERO;
        let out = bilateral_denoise(&source, 4, 4, &prepared(4, 4));
        assert_eq!(out[5], Vec4::ZERO);
        assert!(out[0].truncate().abs_diff_eq(Vec3::splat(0.5), 1e-5));
    }
}

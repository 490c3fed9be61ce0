//! RGBM encoding of HDR lightmap texels
//!
//! Color is stored as `sqrt(rgb) / 8` scaled up by a shared multiplier kept in
//! alpha. The multiplier is quantized to 8 bits and never drops below 1/255,
//! so every written texel has non-zero alpha while unwritten texels stay at 0.

use glam::{Vec3, Vec4};

const RANGE: f32 = 8.0;

pub fn encode_rgbm(color: Vec3) -> Vec4 {
    let rgb = color.max(Vec3::ZERO).powf(0.5) / RANGE;
    let a = rgb.max_element().max(1.0 / 255.0).clamp(0.0, 1.0);
    let a = (a * 255.0).ceil() / 255.0;
    (rgb / a).extend(a)
}

pub fn decode_rgbm(rgbm: Vec4) -> Vec3 {
    let color = (RANGE * rgbm.w) * rgbm.truncate();
    color * color
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hdr_values_survive_the_round_trip() {
        for color in [
            Vec3::new(0.25, 0.5, 1.0),
            Vec3::new(4.0, 2.0, 0.1),
            Vec3::splat(20.0),
        ] {
            let decoded = decode_rgbm(encode_rgbm(color));
            assert!(decoded.abs_diff_eq(color, color.max_element() * 1e-3));
        }
    }

    #[test]
    fn black_still_marks_the_texel_as_written() {
        let encoded = encode_rgbm(Vec3::ZERO);
        assert!(encoded.w > 0.0);
        assert_eq!(decode_rgbm(encoded), Vec3::ZERO);
    }
}

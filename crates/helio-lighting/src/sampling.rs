//! Point sets used to spread virtual lights over a disk or a spherical cap.

use std::f32::consts::TAU;

use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub const GOLDEN_ANGLE: f32 = 2.399_963_2;

/// Point `index` of `count` on a unit disk, laid out along a golden spiral.
pub fn circle_point_deterministic(index: u32, count: u32) -> Vec2 {
    if count == 0 {
        return Vec2::ZERO;
    }
    let radius = (index as f32).sqrt() / (count as f32).sqrt();
    let theta = index as f32 * GOLDEN_ANGLE;
    Vec2::new(theta.cos() * radius, theta.sin() * radius)
}

/// Point `index` of `count` on the unit sphere band between `start` and `end`,
/// both given as fractions of the sphere measured from the +Y pole.
pub fn sphere_point_deterministic(index: u32, count: u32, start: f32, end: f32) -> Vec3 {
    let start = 1.0 - 2.0 * start;
    let end = 1.0 - 2.0 * end;
    let t = if count == 0 {
        0.0
    } else {
        index as f32 / count as f32
    };
    let y = start + (end - start) * t;
    let radius = (1.0 - y * y).max(0.0).sqrt();
    let theta = GOLDEN_ANGLE * index as f32;
    Vec3::new(theta.cos() * radius, y, theta.sin() * radius)
}

/// How virtual light samples are distributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VirtualLightSampling {
    /// Golden-spiral points; identical on every run
    #[default]
    GoldenSpiral,
    /// Uniform random points from a seeded generator
    Jittered { seed: u64 },
}

impl VirtualLightSampling {
    pub fn disk_point(&self, index: u32, count: u32) -> Vec2 {
        match *self {
            VirtualLightSampling::GoldenSpiral => circle_point_deterministic(index, count),
            VirtualLightSampling::Jittered { seed } => {
                let mut rng = sample_rng(seed, index);
                let radius = rng.gen::<f32>().sqrt();
                let theta = rng.gen::<f32>() * TAU;
                Vec2::new(theta.cos() * radius, theta.sin() * radius)
            }
        }
    }

    pub fn sphere_point(&self, index: u32, count: u32, start: f32, end: f32) -> Vec3 {
        match *self {
            VirtualLightSampling::GoldenSpiral => {
                sphere_point_deterministic(index, count, start, end)
            }
            VirtualLightSampling::Jittered { seed } => {
                let mut rng = sample_rng(seed, index);
                let top = 1.0 - 2.0 * start;
                let bottom = 1.0 - 2.0 * end;
                let y = bottom + (top - bottom) * rng.gen::<f32>();
                let radius = (1.0 - y * y).max(0.0).sqrt();
                let theta = rng.gen::<f32>() * TAU;
                Vec3::new(theta.cos() * radius, y, theta.sin() * radius)
            }
        }
    }
}

fn sample_rng(seed: u64, index: u32) -> StdRng {
    StdRng::seed_from_u64(seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

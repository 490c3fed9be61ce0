//! `BakeDevice` implementations

pub mod software;
pub mod wgpu;

pub use self::software::{SoftwareBakeDevice, SoftwareTexture};
pub use self::wgpu::{WgpuBakeDevice, WgpuTexture};

//! Backend-agnostic texture handles and render targets.
//!
//! Devices hand out `TextureRef`s; whoever holds the last clone keeps the GPU
//! allocation alive. Baked lightmaps move into the scene by cloning the final
//! color buffer into the mesh instances' lightmap slots.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Unique identifier for a device resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba16Float,
    Rgba32Float,
    Depth32Float,
}

impl TextureFormat {
    pub fn is_float(self) -> bool {
        matches!(self, Self::Rgba16Float | Self::Rgba32Float)
    }

    pub fn is_depth(self) -> bool {
        matches!(self, Self::Depth32Float)
    }

    pub fn bytes_per_texel(self) -> u32 {
        match self {
            Self::Rgba8Unorm | Self::Depth32Float => 4,
            Self::Rgba16Float => 8,
            Self::Rgba32Float => 16,
        }
    }
}

/// How texel values are to be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureEncoding {
    Linear,
    /// HDR color with a shared multiplier in alpha
    Rgbm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    ClampToEdge,
    Repeat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureDesc {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub layers: u32,
    pub format: TextureFormat,
    pub encoding: TextureEncoding,
    pub mipmaps: bool,
    pub filter: FilterMode,
    pub address: AddressMode,
}

impl TextureDesc {
    /// Square, single-layer, non-mipmapped, nearest-filtered texture used for
    /// lightmap accumulation. RGBA8 storage implies RGBM encoding.
    pub fn lightmap(name: impl Into<String>, size: u32, format: TextureFormat) -> Self {
        Self {
            name: name.into(),
            width: size,
            height: size,
            layers: 1,
            format,
            encoding: if format == TextureFormat::Rgba8Unorm {
                TextureEncoding::Rgbm
            } else {
                TextureEncoding::Linear
            },
            mipmaps: false,
            filter: FilterMode::Nearest,
            address: AddressMode::ClampToEdge,
        }
    }

    pub fn depth(name: impl Into<String>, size: u32, layers: u32) -> Self {
        Self {
            name: name.into(),
            width: size,
            height: size,
            layers,
            format: TextureFormat::Depth32Float,
            encoding: TextureEncoding::Linear,
            mipmaps: false,
            filter: FilterMode::Nearest,
            address: AddressMode::ClampToEdge,
        }
    }

    pub fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize * self.layers as usize
    }
}

/// Downcasting support so backends can recover their concrete texture type
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Texture + 'static> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A device texture. Filtering is mutable after creation because a finished
/// lightmap switches from nearest to linear sampling when handed to the scene.
pub trait Texture: AsAny + fmt::Debug + Send + Sync {
    fn id(&self) -> ResourceId;

    fn desc(&self) -> &TextureDesc;

    fn filter(&self) -> FilterMode;

    fn set_filter(&self, filter: FilterMode);

    fn width(&self) -> u32 {
        self.desc().width
    }

    fn height(&self) -> u32 {
        self.desc().height
    }

    fn name(&self) -> &str {
        &self.desc().name
    }
}

pub type TextureRef = Arc<dyn Texture>;

/// Recover the concrete backend texture behind a `TextureRef`
pub fn downcast_texture<T: Texture + 'static>(texture: &dyn Texture) -> Option<&T> {
    texture.as_any().downcast_ref::<T>()
}

/// A color-only (optionally depth-backed) render destination.
///
/// Deliberately not `Clone`: a render target has exactly one owner at a time.
#[derive(Debug)]
pub struct RenderTarget {
    id: ResourceId,
    name: String,
    color_buffer: TextureRef,
    depth: bool,
}

impl RenderTarget {
    pub fn new(name: impl Into<String>, color_buffer: TextureRef, depth: bool) -> Self {
        Self {
            id: ResourceId::new(),
            name: name.into(),
            color_buffer,
            depth,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color_buffer(&self) -> &TextureRef {
        &self.color_buffer
    }

    pub fn has_depth(&self) -> bool {
        self.depth
    }

    pub fn width(&self) -> u32 {
        self.color_buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.color_buffer.height()
    }
}

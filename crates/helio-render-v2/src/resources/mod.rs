//! Resource management for baking

mod pool;

pub use pool::RenderTargetPool;

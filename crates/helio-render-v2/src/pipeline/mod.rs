//! Bake material variants

mod cache;
mod spec;

pub use cache::{apply_defines, BakeMaterialCache};
pub use spec::{BakeMaterialKey, BakeMaterialSettings};

use thiserror::Error;

/// Result type for bake operations
pub type Result<T> = std::result::Result<T, BakeError>;

/// Errors that abort a bake after scene, lights and nodes were restored
#[derive(Debug, Error)]
pub enum BakeError {
    #[error("Render error: {0}")]
    Render(#[from] helio_render_v2::Error),

    #[error("Scene error: {0}")]
    Scene(#[from] helio_core::HelioError),
}

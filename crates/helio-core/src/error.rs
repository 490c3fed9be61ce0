use thiserror::Error;

#[derive(Error, Debug)]
pub enum HelioError {
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid scene hierarchy: {0}")]
    InvalidHierarchy(String),
}

pub type Result<T> = std::result::Result<T, HelioError>;

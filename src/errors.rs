use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum CollageError {
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

// Implement From traits for common error types to simplify conversion

impl From<std::io::Error> for CollageError {
    fn from(e: std::io::Error) -> Self {
        CollageError::Cache(e.to_string())
    }
}

impl From<reqwest::Error> for CollageError {
    fn from(e: reqwest::Error) -> Self {
        CollageError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for CollageError {
    fn from(e: serde_json::Error) -> Self {
        CollageError::Internal(format!("Serialization error: {}", e))
    }
}

impl From<image::ImageError> for CollageError {
    fn from(e: image::ImageError) -> Self {
        CollageError::Render(e.to_string())
    }
}

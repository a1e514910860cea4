//! Core error types

use thiserror::Error;

/// Failure raised by a constant mapper's side effect (e.g. the shim failed to start)
#[derive(Error, Debug)]
#[error("{message}")]
pub struct MapperError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl MapperError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying error, keeping it as the source
    pub fn from_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Mapper failed while rewriting {artifact}: {source}")]
    Mapper {
        artifact: String,
        #[source]
        source: MapperError,
    },

    #[error("Invalid artifact {artifact}: {reason}")]
    InvalidArtifact { artifact: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

//! Shim error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid API root {value:?}: {reason}")]
    InvalidApiRoot { value: String, reason: &'static str },

    #[error("Invalid value for {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },
}

/// Startup failures. All of them are terminal for the shim subsystem.
#[derive(Error, Debug)]
pub enum StartError {
    #[error("Shim configuration hasn't been set")]
    MissingConfig,

    #[error("Failed to bind shim listener: {0}")]
    Bind(#[source] std::io::Error),

    #[error("Failed to build shim runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("Failed to spawn shim thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Failed to build backend client: {0}")]
    Client(#[source] FetchError),

    #[error("Shim failed to start earlier: {0}")]
    PreviouslyFailed(String),
}

/// Failures while translating one legacy request.
///
/// Protocol violations and malformed data become `500`; they never take the
/// listener down.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid base64 in textures property: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Unexpected response length: {count} profiles for {username}")]
    UnexpectedProfileCount { username: String, count: usize },
}

impl IntoResponse for FetchError {
    fn into_response(self) -> Response {
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

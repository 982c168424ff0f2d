//! Error types for the Graph transport.

use std::path::PathBuf;

use thiserror::Error;

pub type GraphResult<T> = Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    /// Credential parameters that do not describe a valid credential.
    #[error("Invalid credential parameters: {0}")]
    Credential(String),

    #[error("Invalid client certificate {path}: {message}")]
    Certificate { path: PathBuf, message: String },

    #[error("Failed to acquire access token from {source_name}: {message}")]
    TokenAcquisition {
        source_name: &'static str,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GraphError {
    pub(crate) fn token(source_name: &'static str, message: impl Into<String>) -> Self {
        GraphError::TokenAcquisition {
            source_name,
            message: message.into(),
        }
    }
}

//! Error types for the Home Assistant client

use thiserror::Error;

/// Errors returned by backend requests
#[derive(Error, Debug)]
pub enum HaError {
    /// Transport-level failure (connect, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("Unexpected status {status} from {endpoint}")]
    Status { status: u16, endpoint: String },

    /// Response body could not be decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Entity id is not of the form `domain.object_id`
    #[error("Invalid entity id: {0}")]
    InvalidEntityId(String),
}

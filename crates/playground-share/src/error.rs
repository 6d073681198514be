//! Error types for template sharing

use thiserror::Error;

/// Errors that can occur while storing or fetching shared templates
#[derive(Error, Debug)]
pub enum ShareError {
    /// No template is stored under the id
    #[error("shared template not found: {id}")]
    NotFound { id: String },

    /// Serialized payload is over the configured ceiling
    #[error("payload too large: {size} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    /// Every candidate id already holds different code
    #[error("no free share id for this template (last tried {id})")]
    IdCollision { id: String },

    /// Id is not a share id
    #[error("invalid share id: {0:?}")]
    InvalidId(String),

    /// Filesystem error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored or received JSON could not be read
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport failure talking to a remote share server
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote share server answered with an unexpected status
    #[error("share server returned {status}: {message}")]
    Server { status: u16, message: String },
}

impl ShareError {
    /// HTTP status a server should answer with for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ShareError::NotFound { .. } => 404,
            ShareError::PayloadTooLarge { .. } => 413,
            ShareError::InvalidId(_) => 400,
            ShareError::IdCollision { .. } => 409,
            ShareError::Server { status, .. } => *status,
            ShareError::Io(_) | ShareError::Serialization(_) | ShareError::Http(_) => 500,
        }
    }
}

/// Result type for share operations
pub type ShareResult<T> = std::result::Result<T, ShareError>;

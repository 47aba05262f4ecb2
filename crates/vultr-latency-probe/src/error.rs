//! Endpoint file errors
//!
//! Typed errors for loading and validating the endpoint mapping.

use thiserror::Error;

/// Endpoint mapping errors
#[derive(Debug, Error)]
pub enum EndpointsError {
    /// Endpoint name is empty
    #[error("endpoint name cannot be empty")]
    EmptyName,

    /// URL is not an absolute http(s) URL
    #[error("endpoint '{name}' has an invalid URL: {url}")]
    InvalidUrl { name: String, url: String },

    /// Failed to parse the JSON mapping
    #[error("Failed to parse endpoints: {0}")]
    Parse(#[from] serde_json::Error),

    /// Failed to read the endpoints file
    #[error("Failed to read endpoints file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl EndpointsError {
    /// Create an IO error with path context
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

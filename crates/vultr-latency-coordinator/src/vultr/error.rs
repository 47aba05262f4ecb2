//! Vultr API error classification
//!
//! Maps HTTP status codes returned by the provider onto typed errors so the
//! orchestration code can decide what to skip and what to report.

use thiserror::Error;

/// Vultr API error categories
#[derive(Debug, Error)]
pub enum VultrError {
    /// API key missing, invalid, or not allowed from this IP
    #[error("Vultr API rejected credentials ({status}): {body}")]
    Unauthorized { status: u16, body: String },

    /// Resource does not exist (safe to skip in teardown)
    #[error("Resource not found: {body}")]
    NotFound { body: String },

    /// Rate limit exceeded
    #[error("Vultr API rate limit exceeded: {body}")]
    RateLimited { body: String },

    /// Request succeeded at the HTTP level but not with the status the operation requires
    #[error("Unexpected status {status} (expected {expected}): {body}")]
    UnexpectedStatus {
        expected: u16,
        status: u16,
        body: String,
    },

    /// Any other non-success response
    #[error("Vultr API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Connection, TLS or timeout failure
    #[error("Vultr API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("Failed to decode {context} response: {source}")]
    Decode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl VultrError {
    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, VultrError::NotFound { .. })
    }

    /// Get a user-friendly suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            VultrError::Unauthorized { .. } => Some(
                "Check VULTR_API_KEY and that this machine's IP is allowed in the API access control list.",
            ),
            VultrError::RateLimited { .. } => Some("Wait a moment before starting another session."),
            VultrError::Api { status: 400, body } if body.contains("plan") => {
                Some("The plan may not be available in this region.")
            }
            _ => None,
        }
    }
}

/// Classify a non-success HTTP response.
pub fn classify_status(status: u16, body: impl Into<String>) -> VultrError {
    let body = body.into();
    match status {
        401 | 403 => VultrError::Unauthorized { status, body },
        404 => VultrError::NotFound { body },
        429 => VultrError::RateLimited { body },
        _ => VultrError::Api { status, body },
    }
}

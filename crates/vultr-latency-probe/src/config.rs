//! Probe configuration and endpoint loading

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use vultr_latency_common::defaults::{
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_SAMPLES, DEFAULT_SAMPLE_INTERVAL_MS,
};

use crate::error::EndpointsError;

/// Sampling parameters for one probe run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Requests per endpoint
    pub samples: u32,
    /// Pause after each sample round
    pub interval: Duration,
    /// Limit for a single request, body included
    pub request_timeout: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            interval: Duration::from_millis(DEFAULT_SAMPLE_INTERVAL_MS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }
}

/// Parse and validate a `name -> url` mapping
pub fn parse_endpoints(json: &str) -> Result<BTreeMap<String, String>, EndpointsError> {
    let endpoints: BTreeMap<String, String> = serde_json::from_str(json)?;

    for (name, url) in &endpoints {
        if name.trim().is_empty() {
            return Err(EndpointsError::EmptyName);
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(EndpointsError::InvalidUrl {
                name: name.clone(),
                url: url.clone(),
            });
        }
    }

    Ok(endpoints)
}

/// Load the endpoint mapping written by the coordinator
pub fn load_endpoints(path: &Path) -> Result<BTreeMap<String, String>, EndpointsError> {
    let content =
        fs::read_to_string(path).map_err(|e| EndpointsError::io(path.display().to_string(), e))?;
    parse_endpoints(&content)
}

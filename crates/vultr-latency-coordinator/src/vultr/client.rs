//! Vultr v2 HTTP client

use std::fmt;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};
use vultr_latency_common::defaults::DEFAULT_API_BASE_URL;

use super::error::{classify_status, VultrError};
use super::types::{
    InstanceEnvelope, InstanceInfo, LaunchInstanceConfig, ProviderRegion, RegionsEnvelope,
};

/// Timeout applied to every API request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin wrapper over the instance and region endpoints of the Vultr API
#[derive(Clone)]
pub struct VultrClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl fmt::Debug for VultrClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VultrClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl VultrClient {
    /// Create a client against the public API
    pub fn new(api_key: impl Into<String>) -> Result<Self, VultrError> {
        Self::with_base_url(api_key, DEFAULT_API_BASE_URL)
    }

    /// Create a client against a custom base URL (e.g., a local stub)
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, VultrError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("vultr-latency/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
    }

    /// Read the body of a response that must carry `expected` status.
    ///
    /// Non-matching responses are logged with status and body.
    async fn expect_status(
        response: Response,
        expected: StatusCode,
        operation: &str,
    ) -> Result<String, VultrError> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status == expected {
            return Ok(body);
        }

        error!(
            operation,
            status = status.as_u16(),
            body = %body,
            "Vultr API call failed"
        );

        if status.is_success() {
            Err(VultrError::UnexpectedStatus {
                expected: expected.as_u16(),
                status: status.as_u16(),
                body,
            })
        } else {
            Err(classify_status(status.as_u16(), body))
        }
    }

    fn decode<T: DeserializeOwned>(body: &str, context: &'static str) -> Result<T, VultrError> {
        serde_json::from_str(body).map_err(|source| VultrError::Decode { context, source })
    }

    /// Create an instance, returning the provider-assigned id.
    ///
    /// Success is HTTP 202. Not retried.
    pub async fn create_instance(&self, config: &LaunchInstanceConfig) -> Result<String, VultrError> {
        let request = config.to_request();
        if !request.sshkey_ids.is_empty() {
            info!(region = %config.region, sshkey_ids = ?request.sshkey_ids, "Attaching SSH keys");
        }

        let response = self
            .request(Method::POST, "/instances")
            .json(&request)
            .send()
            .await?;
        let body = Self::expect_status(response, StatusCode::ACCEPTED, "create_instance").await?;
        let envelope: InstanceEnvelope = Self::decode(&body, "create_instance")?;

        info!(
            region = %config.region,
            instance_id = %envelope.instance.id,
            label = %config.label,
            "Instance created"
        );
        Ok(envelope.instance.id)
    }

    /// Fetch current instance state
    pub async fn get_instance(&self, instance_id: &str) -> Result<InstanceInfo, VultrError> {
        let response = self
            .request(Method::GET, &format!("/instances/{instance_id}"))
            .send()
            .await?;
        let body = Self::expect_status(response, StatusCode::OK, "get_instance").await?;
        let envelope: InstanceEnvelope = Self::decode(&body, "get_instance")?;

        debug!(
            instance_id = %instance_id,
            status = %envelope.instance.status,
            power_status = %envelope.instance.power_status,
            "Instance state"
        );
        Ok(envelope.instance)
    }

    /// Delete an instance. Success is HTTP 204.
    pub async fn delete_instance(&self, instance_id: &str) -> Result<(), VultrError> {
        let response = self
            .request(Method::DELETE, &format!("/instances/{instance_id}"))
            .send()
            .await?;
        Self::expect_status(response, StatusCode::NO_CONTENT, "delete_instance").await?;

        info!(instance_id = %instance_id, "Instance deleted");
        Ok(())
    }

    /// List regions offered by the provider
    pub async fn list_regions(&self) -> Result<Vec<ProviderRegion>, VultrError> {
        let response = self
            .request(Method::GET, "/regions?per_page=500")
            .send()
            .await?;
        let body = Self::expect_status(response, StatusCode::OK, "list_regions").await?;
        let envelope: RegionsEnvelope = Self::decode(&body, "list_regions")?;
        Ok(envelope.regions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_api_key() {
        let client = VultrClient::new("super-secret").unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = VultrClient::with_base_url("k", "http://127.0.0.1:8080/v2/").unwrap();
        let debug = format!("{client:?}");
        assert!(debug.contains("\"http://127.0.0.1:8080/v2\""));
    }
}

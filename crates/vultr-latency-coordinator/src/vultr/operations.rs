//! Instance operations trait for testing

use super::error::VultrError;
use super::types::{InstanceInfo, LaunchInstanceConfig};
use super::VultrClient;

/// Trait for provider operations that can be mocked in tests.
///
/// This trait abstracts the instance lifecycle calls to enable unit testing
/// of the deployer and session logic without hitting the real API.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
#[cfg_attr(test, mockall::automock)]
pub trait InstanceOperations: Send + Sync {
    /// Create an instance, returning its id
    async fn create_instance(&self, config: LaunchInstanceConfig) -> Result<String, VultrError>;

    /// Fetch current instance state
    async fn get_instance(&self, instance_id: &str) -> Result<InstanceInfo, VultrError>;

    /// Delete an instance
    async fn delete_instance(&self, instance_id: &str) -> Result<(), VultrError>;
}

impl InstanceOperations for VultrClient {
    async fn create_instance(&self, config: LaunchInstanceConfig) -> Result<String, VultrError> {
        VultrClient::create_instance(self, &config).await
    }

    async fn get_instance(&self, instance_id: &str) -> Result<InstanceInfo, VultrError> {
        VultrClient::get_instance(self, instance_id).await
    }

    async fn delete_instance(&self, instance_id: &str) -> Result<(), VultrError> {
        VultrClient::delete_instance(self, instance_id).await
    }
}

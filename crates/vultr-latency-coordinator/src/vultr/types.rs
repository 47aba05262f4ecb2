//! Vultr API request and response types

use serde::{Deserialize, Serialize};
use vultr_latency_common::defaults::{DEFAULT_OS_ID, DEFAULT_PLAN};

/// Configuration for launching one instance
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchInstanceConfig {
    /// Provider region code (e.g., "nrt")
    pub region: String,
    /// Label, also used as hostname
    pub label: String,
    /// User data script (will be base64 encoded)
    pub user_data: String,
    /// Plan id
    pub plan: String,
    /// Operating system id
    pub os_id: u32,
    /// API-registered SSH key ids to attach
    pub sshkey_ids: Vec<String>,
}

impl LaunchInstanceConfig {
    /// Create a new launch configuration with required fields
    pub fn new(
        region: impl Into<String>,
        label: impl Into<String>,
        user_data: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            label: label.into(),
            user_data: user_data.into(),
            plan: DEFAULT_PLAN.to_string(),
            os_id: DEFAULT_OS_ID,
            sshkey_ids: Vec::new(),
        }
    }

    pub fn with_plan(mut self, plan: impl Into<String>, os_id: u32) -> Self {
        self.plan = plan.into();
        self.os_id = os_id;
        self
    }

    pub fn with_ssh_keys(mut self, sshkey_ids: Vec<String>) -> Self {
        self.sshkey_ids = sshkey_ids;
        self
    }

    /// Build the `POST /instances` body
    pub fn to_request(&self) -> CreateInstanceRequest {
        use base64::Engine;

        CreateInstanceRequest {
            region: self.region.clone(),
            plan: self.plan.clone(),
            os_id: self.os_id,
            label: self.label.clone(),
            hostname: self.label.clone(),
            enable_ipv6: true,
            user_data: base64::engine::general_purpose::STANDARD.encode(self.user_data.as_bytes()),
            backups: "disabled".to_string(),
            sshkey_ids: self.sshkey_ids.clone(),
        }
    }
}

/// `POST /instances` body
#[derive(Debug, Clone, Serialize)]
pub struct CreateInstanceRequest {
    pub region: String,
    pub plan: String,
    pub os_id: u32,
    pub label: String,
    pub hostname: String,
    pub enable_ipv6: bool,
    pub user_data: String,
    pub backups: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sshkey_ids: Vec<String>,
}

/// Wrapper around single-instance responses
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceEnvelope {
    pub instance: InstanceInfo,
}

/// Instance fields the tool cares about
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InstanceInfo {
    pub id: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub label: String,
    /// "pending", "active", "suspended", "resizing"
    #[serde(default)]
    pub status: String,
    /// "running", "stopped"
    #[serde(default)]
    pub power_status: String,
    #[serde(default)]
    pub main_ip: String,
}

impl InstanceInfo {
    /// Ready once the provider reports the instance active and powered on
    pub fn is_ready(&self) -> bool {
        self.status == "active" && self.power_status == "running"
    }

    /// Public IP when ready. The provider reports `0.0.0.0` until one is assigned.
    pub fn ready_ip(&self) -> Option<&str> {
        if self.is_ready() && !self.main_ip.is_empty() && self.main_ip != "0.0.0.0" {
            Some(&self.main_ip)
        } else {
            None
        }
    }
}

/// `GET /regions` response
#[derive(Debug, Clone, Deserialize)]
pub struct RegionsEnvelope {
    pub regions: Vec<ProviderRegion>,
}

/// A region as listed by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRegion {
    pub id: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub continent: String,
}

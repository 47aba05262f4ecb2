//! Core types for the orchestrator
//!
//! Contains `InstanceRecord` and `InstanceStatus`, used to track each
//! region's instance from creation to teardown.

/// One region's instance during a session
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceRecord {
    /// Catalog region code
    pub region: String,
    /// Provider instance id (empty until created)
    pub instance_id: String,
    /// Public IP (once ready)
    pub public_ip: Option<String>,
    /// Current status
    pub status: InstanceStatus,
}

impl InstanceRecord {
    /// Create a record for a region with pending status
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            instance_id: String::new(),
            public_ip: None,
            status: InstanceStatus::Pending,
        }
    }

    /// Record a successful create call
    pub fn created(region: impl Into<String>, instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            status: InstanceStatus::Provisioning,
            ..Self::new(region)
        }
    }

    pub fn mark_ready(&mut self, ip: impl Into<String>) {
        self.public_ip = Some(ip.into());
        self.status = InstanceStatus::Ready;
    }

    /// Ready instances have an IP and are eligible for probing
    pub fn is_ready(&self) -> bool {
        self.status == InstanceStatus::Ready && self.public_ip.is_some()
    }

    /// Whether a provider instance exists that teardown must delete
    pub fn needs_teardown(&self) -> bool {
        !self.instance_id.is_empty() && self.status != InstanceStatus::Destroyed
    }
}

/// Status of a region's instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum InstanceStatus {
    /// Not yet requested
    #[default]
    Pending,
    /// Create call in flight
    Creating,
    /// Created, waiting for active/running
    Provisioning,
    /// Active, running and addressable
    Ready,
    /// Create failed or never became ready
    Failed,
    /// Deleted
    Destroyed,
}

/// Ready `(region, ip)` pairs in record order
pub fn ready_hosts(records: &[InstanceRecord]) -> Vec<(String, String)> {
    records
        .iter()
        .filter(|r| r.is_ready())
        .filter_map(|r| r.public_ip.as_ref().map(|ip| (r.region.clone(), ip.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let mut record = InstanceRecord::created("nrt", "abc");
        assert_eq!(record.status, InstanceStatus::Provisioning);
        assert!(!record.is_ready());
        assert!(record.needs_teardown());

        record.mark_ready("203.0.113.1");
        assert!(record.is_ready());

        record.status = InstanceStatus::Destroyed;
        assert!(!record.needs_teardown());
    }

    #[test]
    fn test_failed_create_needs_no_teardown() {
        let mut record = InstanceRecord::new("fra");
        record.status = InstanceStatus::Failed;
        assert!(!record.needs_teardown());
    }

    #[test]
    fn test_ready_hosts_skips_unready() {
        let mut a = InstanceRecord::created("nrt", "1");
        a.mark_ready("10.0.0.1");
        let b = InstanceRecord::created("sgp", "2");
        let hosts = ready_hosts(&[a, b]);
        assert_eq!(hosts, vec![("nrt".to_string(), "10.0.0.1".to_string())]);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(InstanceStatus::Provisioning.to_string(), "provisioning");
        assert_eq!(InstanceStatus::Ready.as_ref(), "ready");
    }
}

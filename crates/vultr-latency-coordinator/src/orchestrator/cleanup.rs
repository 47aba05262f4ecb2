//! Instance teardown

use tracing::{info, warn};

use super::deployer::Deployer;
use super::types::{InstanceRecord, InstanceStatus};
use crate::vultr::InstanceOperations;

/// What teardown did, per region
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Regions whose instance is gone
    pub destroyed: Vec<String>,
    /// `(region, error)` for deletions that failed
    pub failed: Vec<(String, String)>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Delete every created instance, ready or not.
///
/// Failures are logged and reported; they never stop the remaining deletions.
pub async fn destroy_all<O: InstanceOperations>(
    deployer: &Deployer<O>,
    records: &mut [InstanceRecord],
) -> TeardownReport {
    let mut report = TeardownReport::default();
    let targets = records.iter().filter(|r| r.needs_teardown()).count();
    info!(count = targets, "Destroying instances");

    for record in records.iter_mut().filter(|r| r.needs_teardown()) {
        match deployer.destroy(&record.instance_id).await {
            Ok(()) => {
                info!(region = %record.region, instance_id = %record.instance_id, "Instance destroyed");
                println!("  destroyed {} ({})", record.region, record.instance_id);
                record.status = InstanceStatus::Destroyed;
                report.destroyed.push(record.region.clone());
            }
            Err(e) => {
                warn!(
                    region = %record.region,
                    instance_id = %record.instance_id,
                    error = %e,
                    "Failed to destroy instance"
                );
                println!("  failed to destroy {} ({}): {e}", record.region, record.instance_id);
                report.failed.push((record.region.clone(), e.to_string()));
            }
        }
    }

    report
}

/// Print instances left running
pub fn print_kept(records: &[InstanceRecord]) {
    let kept: Vec<_> = records.iter().filter(|r| r.needs_teardown()).collect();
    if kept.is_empty() {
        return;
    }
    println!("\nInstances kept (delete them from the Vultr console when done):");
    for record in kept {
        println!(
            "  {} {} {}",
            record.region,
            record.instance_id,
            record.public_ip.as_deref().unwrap_or("-")
        );
    }
}

//! Instance provisioning, readiness polling and deletion

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use vultr_latency_common::SessionId;

use super::types::{InstanceRecord, InstanceStatus};
use crate::vultr::{InstanceOperations, LaunchInstanceConfig, VultrError};
use crate::wait::{wait_for_resource, WaitConfig, WaitError};

/// Instance shape shared by every region
#[derive(Debug, Clone)]
pub struct LaunchTemplate {
    pub plan: String,
    pub os_id: u32,
    pub sshkey_ids: Vec<String>,
    pub user_data: String,
}

/// Drives the provider API for a whole session
pub struct Deployer<O> {
    ops: O,
    template: LaunchTemplate,
}

impl<O: InstanceOperations> Deployer<O> {
    pub fn new(ops: O, template: LaunchTemplate) -> Self {
        Self { ops, template }
    }

    /// Create one instance, returning its id
    pub async fn create_instance(&self, region: &str, label: &str) -> Result<String, VultrError> {
        let config = LaunchInstanceConfig::new(region, label, self.template.user_data.as_str())
            .with_plan(self.template.plan.as_str(), self.template.os_id)
            .with_ssh_keys(self.template.sshkey_ids.clone());
        self.ops.create_instance(config).await
    }

    /// Create one instance per region. Failed regions are recorded as `Failed`.
    pub async fn provision(&self, regions: &[String], session: &SessionId) -> Vec<InstanceRecord> {
        let mut records = Vec::with_capacity(regions.len());

        for region in regions {
            let mut record = InstanceRecord::new(region.as_str());
            record.status = InstanceStatus::Creating;
            let label = session.instance_label(region);

            match self.create_instance(region, &label).await {
                Ok(instance_id) => {
                    info!(region = %region, instance_id = %instance_id, "Instance requested");
                    record.instance_id = instance_id;
                    record.status = InstanceStatus::Provisioning;
                }
                Err(e) => {
                    error!(region = %region, error = %e, "Failed to create instance");
                    if let Some(hint) = e.suggestion() {
                        warn!(region = %region, "{hint}");
                    }
                    record.status = InstanceStatus::Failed;
                }
            }
            records.push(record);
        }

        records
    }

    /// One status poll. Returns the public IP once ready; failures count as "not yet".
    pub async fn poll_ready(&self, instance_id: &str) -> Option<String> {
        match self.ops.get_instance(instance_id).await {
            Ok(info) => info.ready_ip().map(str::to_string),
            Err(e) => {
                warn!(instance_id = %instance_id, error = %e, "Status poll failed");
                None
            }
        }
    }

    /// Poll every provisioning instance until all are ready or the wait ends.
    ///
    /// Returns the number of ready instances. Instances that never became
    /// ready are marked `Failed` and excluded from probing.
    pub async fn wait_for_all(
        &self,
        records: &mut [InstanceRecord],
        wait: &WaitConfig,
        cancel: Option<&CancellationToken>,
    ) -> Result<usize, WaitError> {
        let pending: Mutex<Vec<(usize, String)>> = Mutex::new(
            records
                .iter()
                .enumerate()
                .filter(|(_, r)| r.status == InstanceStatus::Provisioning)
                .map(|(i, r)| (i, r.instance_id.clone()))
                .collect(),
        );
        let ready: Mutex<Vec<(usize, String)>> = Mutex::new(Vec::new());
        let (pending_ref, ready_ref) = (&pending, &ready);

        let result = wait_for_resource(
            wait,
            cancel,
            move || async move {
                let snapshot = pending_ref.lock().await.clone();
                let mut still_pending = Vec::new();

                for (index, instance_id) in snapshot {
                    match self.poll_ready(&instance_id).await {
                        Some(ip) => {
                            info!(instance_id = %instance_id, ip = %ip, "Instance ready");
                            ready_ref.lock().await.push((index, ip));
                        }
                        None => still_pending.push((index, instance_id)),
                    }
                }

                debug!(remaining = still_pending.len(), "Readiness poll finished");
                let done = still_pending.is_empty();
                *pending_ref.lock().await = still_pending;
                Ok(done)
            },
            "instances",
        )
        .await;

        for (index, ip) in ready.into_inner() {
            records[index].mark_ready(ip);
        }

        match result {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                for (index, _) in pending.into_inner() {
                    let record = &mut records[index];
                    warn!(
                        region = %record.region,
                        instance_id = %record.instance_id,
                        "Instance not ready in time, excluded from probing"
                    );
                    record.status = InstanceStatus::Failed;
                }
                debug!(error = %e, "Readiness wait ended early");
            }
        }

        Ok(records.iter().filter(|r| r.is_ready()).count())
    }

    /// Delete an instance. A missing instance counts as already deleted.
    pub async fn destroy(&self, instance_id: &str) -> Result<(), VultrError> {
        match self.ops.delete_instance(instance_id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!(instance_id = %instance_id, "Instance already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

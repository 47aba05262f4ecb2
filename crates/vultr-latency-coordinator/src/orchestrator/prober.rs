//! Remote probing over ssh/scp
//!
//! For each ready host: wait for the shell, upload the endpoint mapping (and
//! the probe binary, once per host), run the probe and parse its JSON report.

use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use vultr_latency_common::defaults::{REMOTE_ENDPOINTS_PATH, REMOTE_PROBE_PATH};
use vultr_latency_common::ProbeReport;

use super::command::{run_command, CommandError, CommandOutput};
use crate::config::SshConfig;
use crate::wait::{wait_for_resource, WaitConfig};

/// Remote access errors. A failing region yields no records for that pass.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Shell on {ip} unreachable after {attempts} attempts")]
    ShellUnreachable { ip: String, attempts: u32 },

    #[error("Copy of {what} to {ip} failed (exit {code:?}): {stderr}")]
    Transfer {
        ip: String,
        what: &'static str,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Probe on {ip} exited with {code:?}: {stderr}")]
    RemoteExit {
        ip: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Remote command on {ip} timed out after {secs}s")]
    Timeout { ip: String, secs: u64 },

    #[error("Failed to write endpoint list: {0}")]
    EndpointsWrite(#[source] serde_json::Error),

    #[error("Failed to parse probe output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProbeError {
    fn from_command(ip: &str, err: CommandError) -> Self {
        match err {
            CommandError::Timeout { timeout, .. } => ProbeError::Timeout {
                ip: ip.to_string(),
                secs: timeout.as_secs(),
            },
            CommandError::Spawn { source, .. } => ProbeError::Io(source),
        }
    }
}

/// Trait for remote probing that can be mocked in tests.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
#[cfg_attr(test, mockall::automock)]
pub trait RemoteProbe: Send + Sync {
    /// Block until `ssh root@ip echo ok` succeeds or the retry budget runs out
    async fn wait_for_shell_ready(&self, ip: &str) -> Result<(), ProbeError>;

    /// Run the probe on `ip` against `endpoints` (name → URL)
    async fn probe(
        &self,
        region: &str,
        ip: &str,
        endpoints: &BTreeMap<String, String>,
    ) -> Result<ProbeReport, ProbeError>;
}

/// `ssh` argument list for running `remote_command` as root on `ip`
pub fn ssh_args(ssh: &SshConfig, ip: &str, remote_command: &str) -> Vec<String> {
    let mut args = ssh.common_args();
    args.push(format!("root@{ip}"));
    args.push(remote_command.to_string());
    args
}

/// `scp` argument list for copying `local` to `remote_path` on `ip`
pub fn scp_args(ssh: &SshConfig, local: &Path, ip: &str, remote_path: &str) -> Vec<String> {
    let mut args = ssh.common_args();
    args.push(local.display().to_string());
    args.push(format!("root@{ip}:{remote_path}"));
    args
}

/// Remote command line that runs the uploaded probe
pub fn probe_command() -> String {
    format!("{REMOTE_PROBE_PATH} --endpoints {REMOTE_ENDPOINTS_PATH}")
}

/// Serialize the endpoint mapping uploaded to the host
pub fn write_endpoints<W: Write>(
    writer: W,
    endpoints: &BTreeMap<String, String>,
) -> Result<(), ProbeError> {
    serde_json::to_writer(writer, endpoints).map_err(ProbeError::EndpointsWrite)
}

/// Prober backed by the local `ssh` and `scp` binaries
pub struct SshProber {
    ssh: SshConfig,
    probe_binary: PathBuf,
    /// Hosts that already have the probe binary
    installed: Mutex<HashSet<String>>,
}

impl SshProber {
    pub fn new(ssh: SshConfig, probe_binary: PathBuf) -> Self {
        Self {
            ssh,
            probe_binary,
            installed: Mutex::new(HashSet::new()),
        }
    }

    async fn copy(
        &self,
        ip: &str,
        local: &Path,
        remote_path: &str,
        what: &'static str,
    ) -> Result<(), ProbeError> {
        let output = self
            .run(
                &self.ssh.scp_program,
                scp_args(&self.ssh, local, ip, remote_path),
                ip,
                self.ssh.probe_timeout,
            )
            .await?;
        if !output.success() {
            return Err(ProbeError::Transfer {
                ip: ip.to_string(),
                what,
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    async fn run(
        &self,
        program: &str,
        args: Vec<String>,
        ip: &str,
        timeout: std::time::Duration,
    ) -> Result<CommandOutput, ProbeError> {
        run_command(program, &args, timeout)
            .await
            .map_err(|e| ProbeError::from_command(ip, e))
    }

    /// Upload and mark executable the probe binary, once per host
    async fn ensure_probe_installed(&self, ip: &str) -> Result<(), ProbeError> {
        let mut installed = self.installed.lock().await;
        if installed.contains(ip) {
            return Ok(());
        }

        info!(ip = %ip, binary = %self.probe_binary.display(), "Uploading probe binary");
        self.copy(ip, &self.probe_binary, REMOTE_PROBE_PATH, "probe binary")
            .await?;

        let chmod = format!("chmod +x {REMOTE_PROBE_PATH}");
        let output = self
            .run(
                &self.ssh.ssh_program,
                ssh_args(&self.ssh, ip, &chmod),
                ip,
                self.ssh.check_timeout(),
            )
            .await?;
        if !output.success() {
            return Err(ProbeError::RemoteExit {
                ip: ip.to_string(),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        installed.insert(ip.to_string());
        Ok(())
    }
}

impl RemoteProbe for SshProber {
    async fn wait_for_shell_ready(&self, ip: &str) -> Result<(), ProbeError> {
        let retries = self.ssh.shell_retries.max(1);
        let config = WaitConfig::attempts(retries, self.ssh.shell_retry_delay);
        let mut attempt = 0u32;

        let result = wait_for_resource(
            &config,
            None,
            || {
                attempt += 1;
                let current = attempt;
                let program = self.ssh.ssh_program.clone();
                let args = ssh_args(&self.ssh, ip, "echo ok");
                let timeout = self.ssh.check_timeout();
                async move {
                    match run_command(&program, &args, timeout).await {
                        Ok(out) if out.success() && out.stdout.trim() == "ok" => Ok(true),
                        Ok(out) => {
                            info!(
                                ip = %ip,
                                attempt = current,
                                retries,
                                code = ?out.code,
                                "Shell not ready"
                            );
                            Ok(false)
                        }
                        Err(e) => {
                            info!(ip = %ip, attempt = current, retries, error = %e, "Shell not ready");
                            Ok(false)
                        }
                    }
                }
            },
            &format!("shell on {ip}"),
        )
        .await;

        result.map_err(|_| {
            error!(ip = %ip, retries, "Shell unreachable");
            ProbeError::ShellUnreachable {
                ip: ip.to_string(),
                attempts: retries,
            }
        })
    }

    async fn probe(
        &self,
        region: &str,
        ip: &str,
        endpoints: &BTreeMap<String, String>,
    ) -> Result<ProbeReport, ProbeError> {
        self.wait_for_shell_ready(ip).await?;

        // Transient local copy of the endpoint mapping, removed on drop
        let mut file = tempfile::Builder::new()
            .prefix("endpoints-")
            .suffix(".json")
            .tempfile()?;
        write_endpoints(&mut file, endpoints)?;
        file.flush()?;

        self.copy(ip, file.path(), REMOTE_ENDPOINTS_PATH, "endpoint list")
            .await?;
        self.ensure_probe_installed(ip).await?;

        info!(region = %region, ip = %ip, endpoints = endpoints.len(), "Running probe");
        let output = self
            .run(
                &self.ssh.ssh_program,
                ssh_args(&self.ssh, ip, &probe_command()),
                ip,
                self.ssh.probe_timeout,
            )
            .await?;

        if !output.success() {
            return Err(ProbeError::RemoteExit {
                ip: ip.to_string(),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        let report = ProbeReport::parse(&output.stdout)?;
        debug!(region = %region, results = report.len(), "Probe finished");
        Ok(report)
    }
}

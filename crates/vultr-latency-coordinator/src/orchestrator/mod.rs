//! Session orchestration
//!
//! A session is a linear run through provisioning, readiness polling, one or
//! more measurement passes, reporting and the teardown decision. Provider and
//! remote-shell access go through the `InstanceOperations` and `RemoteProbe`
//! traits so the whole flow can run against fakes.

pub mod cleanup;
pub mod command;
pub mod deployer;
pub mod measurement;
pub mod prober;
pub mod prompt;
pub mod results;
pub mod types;
pub mod user_data;

pub use cleanup::{destroy_all, TeardownReport};
pub use deployer::{Deployer, LaunchTemplate};
pub use measurement::{pivot, run_pass, top_n, Measurement, PivotTable};
pub use prober::{ProbeError, RemoteProbe, SshProber};
pub use prompt::{TeardownDecision, TestMode};
pub use types::{InstanceRecord, InstanceStatus};

use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use vultr_latency_common::{Catalog, SessionId};

use crate::config::{find_probe_binary, RunConfig};
use crate::vultr::{InstanceOperations, VultrClient};
use crate::wait::WaitConfig;

/// Session state machine phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum SessionPhase {
    Idle,
    Provisioning,
    AwaitingReady,
    Measuring,
    Reporting,
    TeardownDecision,
    Done,
}

/// Tunables for one session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub session_id: SessionId,
    /// Readiness polling interval and wall-clock cap
    pub ready_wait: WaitConfig,
    /// Pause between passes in timed mode
    pub pass_interval: Duration,
    /// Teardown prompt timeout
    pub teardown_prompt: Duration,
    pub top_n: usize,
    pub output_dir: PathBuf,
    /// Preselected mode; the operator is asked when unset
    pub mode: Option<TestMode>,
    /// Never destroy
    pub keep: bool,
}

impl SessionOptions {
    pub fn from_config(config: &RunConfig) -> Self {
        let session = &config.session;
        Self {
            session_id: SessionId::new(),
            ready_wait: WaitConfig::polling(session.poll_interval, session.ready_timeout),
            pass_interval: session.pass_interval,
            teardown_prompt: session.teardown_prompt,
            top_n: session.top_n,
            output_dir: session.output_dir.clone(),
            mode: session
                .duration
                .as_deref()
                .map(|answer| TestMode::from_minutes(prompt::parse_duration_choice(answer))),
            keep: config.flags.keep,
        }
    }
}

/// Everything a finished session produced
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub instances: Vec<InstanceRecord>,
    pub measurements: Vec<Measurement>,
    /// `None` when measuring was skipped
    pub mode: Option<TestMode>,
    pub passes: u32,
    pub export_path: Option<PathBuf>,
    pub teardown: TeardownDecision,
    /// Whether the operator was asked before teardown
    pub prompted: bool,
    pub teardown_report: Option<TeardownReport>,
    pub cancelled: bool,
}

/// One measurement session over a catalog
pub struct Session<'a, O, P> {
    catalog: &'a Catalog,
    deployer: Deployer<O>,
    prober: P,
    options: SessionOptions,
    phase: SessionPhase,
}

impl<'a, O: InstanceOperations, P: RemoteProbe> Session<'a, O, P> {
    pub fn new(catalog: &'a Catalog, deployer: Deployer<O>, prober: P, options: SessionOptions) -> Self {
        Self {
            catalog,
            deployer,
            prober,
            options,
            phase: SessionPhase::Idle,
        }
    }

    fn enter(&mut self, phase: SessionPhase) {
        info!(from = %self.phase, to = %phase, session = %self.options.session_id, "Session phase");
        self.phase = phase;
    }

    /// Run the session to completion.
    ///
    /// `input` supplies operator answers. Cancelling `cancel` skips straight
    /// to teardown.
    pub async fn run<R: AsyncBufRead + Unpin>(
        &mut self,
        input: &mut R,
        cancel: &CancellationToken,
    ) -> SessionOutcome {
        let mut cancelled = false;

        self.enter(SessionPhase::Provisioning);
        let codes: Vec<String> = self.catalog.codes().into_iter().map(String::from).collect();
        println!("\nDeploying to {} regions...", codes.len());
        let mut instances = self
            .deployer
            .provision(&codes, &self.options.session_id)
            .await;
        for record in &instances {
            match record.status {
                InstanceStatus::Provisioning => {
                    println!("  created {}: {}", record.region, record.instance_id)
                }
                _ => println!("  failed to create {}", record.region),
            }
        }
        if cancel.is_cancelled() {
            cancelled = true;
        }

        if !cancelled {
            self.enter(SessionPhase::AwaitingReady);
            println!("\nWaiting for instances to boot (2-3 minutes)...");
            match self
                .deployer
                .wait_for_all(&mut instances, &self.options.ready_wait, Some(cancel))
                .await
            {
                Ok(ready) => info!(ready, total = instances.len(), "Readiness wait finished"),
                Err(e) => {
                    warn!(error = %e, "Readiness wait interrupted");
                    cancelled = true;
                }
            }
            for record in instances.iter().filter(|r| r.is_ready()) {
                println!(
                    "  {} ready: {}",
                    record.region,
                    record.public_ip.as_deref().unwrap_or_default()
                );
            }
        }

        let hosts = types::ready_hosts(&instances);
        let mut measurements = Vec::new();
        let mut passes = 0u32;
        let mut mode = None;

        if !cancelled && hosts.is_empty() {
            warn!("No instance became ready, skipping measurement");
        } else if !cancelled {
            let chosen = match self.options.mode {
                Some(preset) => Some(preset),
                None => tokio::select! {
                    chosen = prompt::ask_duration(input) => Some(chosen),
                    _ = cancel.cancelled() => None,
                },
            };

            match chosen {
                Some(chosen) => {
                    mode = Some(chosen);
                    self.enter(SessionPhase::Measuring);
                    cancelled = self
                        .measure(chosen, &hosts, cancel, &mut measurements, &mut passes)
                        .await;
                }
                None => cancelled = true,
            }
        }

        self.enter(SessionPhase::Reporting);
        let minutes = mode.map_or(0, |m: TestMode| m.minutes());
        results::print_report(&measurements, self.options.top_n);
        let export_path = match results::export(
            &measurements,
            &self.options.output_dir,
            chrono::Local::now().naive_local(),
            minutes,
        ) {
            Ok(Some(path)) => {
                println!("\nResults saved: {}", path.display());
                Some(path)
            }
            Ok(None) => {
                println!("\nNo results to save.");
                None
            }
            Err(e) => {
                error!(error = ?e, "Failed to export results");
                None
            }
        };
        results::print_cost_estimate(&results::CostEstimate {
            instances: hosts.len(),
            test_minutes: minutes,
        });

        self.enter(SessionPhase::TeardownDecision);
        let mut prompted = false;
        let teardown = if self.options.keep {
            TeardownDecision::Keep
        } else if cancelled || !matches!(mode, Some(TestMode::Timed(_))) {
            TeardownDecision::Destroy
        } else {
            prompted = true;
            tokio::select! {
                decision = prompt::ask_teardown(input, self.options.teardown_prompt) => decision,
                _ = cancel.cancelled() => TeardownDecision::Destroy,
            }
        };
        info!(decision = %teardown, "Teardown decision");

        let teardown_report = if teardown.destroys() {
            if teardown == TeardownDecision::DestroyOnTimeout {
                println!("No answer, destroying instances...");
            } else {
                println!("\nDestroying instances...");
            }
            Some(destroy_all(&self.deployer, &mut instances).await)
        } else {
            println!("Instances kept at your request.");
            None
        };
        cleanup::print_kept(&instances);

        self.enter(SessionPhase::Done);
        SessionOutcome {
            instances,
            measurements,
            mode,
            passes,
            export_path,
            teardown,
            prompted,
            teardown_report,
            cancelled,
        }
    }

    /// Run measurement passes. Returns whether the session was cancelled.
    async fn measure(
        &self,
        mode: TestMode,
        hosts: &[(String, String)],
        cancel: &CancellationToken,
        measurements: &mut Vec<Measurement>,
        passes: &mut u32,
    ) -> bool {
        match mode {
            TestMode::SinglePass => {
                println!("Single-pass test (one iteration per region)...");
                *passes = 1;
                tokio::select! {
                    records = run_pass(&self.prober, self.catalog, hosts, 1) => {
                        measurements.extend(records);
                        false
                    }
                    _ = cancel.cancelled() => true,
                }
            }
            TestMode::Timed(duration) => {
                println!("Testing for {} minutes...", mode.minutes());
                let start = Instant::now();
                while start.elapsed() < duration {
                    *passes += 1;
                    let pass = *passes;
                    println!("\nPass {pass}...");

                    tokio::select! {
                        records = run_pass(&self.prober, self.catalog, hosts, pass) => {
                            info!(pass, records = records.len(), "Pass finished");
                            measurements.extend(records);
                        }
                        _ = cancel.cancelled() => return true,
                    }

                    tokio::select! {
                        _ = tokio::time::sleep(self.options.pass_interval) => {}
                        _ = cancel.cancelled() => return true,
                    }
                }
                false
            }
        }
    }
}

/// Cancel the session on the first interrupt and force quit on the second.
///
/// `next_signal` resolves to `false` when no further signal can arrive.
pub async fn handle_interrupts<S, F, Q>(mut next_signal: S, cancel: CancellationToken, force_quit: Q)
where
    S: FnMut() -> F,
    F: Future<Output = bool>,
    Q: FnOnce(),
{
    if !next_signal().await {
        return;
    }
    warn!("Interrupted, proceeding to teardown (press Ctrl-C again to quit without cleanup)");
    cancel.cancel();

    if !next_signal().await {
        return;
    }
    error!("Interrupted again, exiting now; instances may still be running");
    force_quit();
}

/// Print what a session would do, without touching the network
pub fn print_plan(catalog: &Catalog, config: &RunConfig) {
    println!("\n=== Dry run ===");
    println!("Plan: {} (os {})", config.vultr.plan, config.vultr.os_id);
    for region in catalog.regions() {
        println!(
            "  {} {:<12} {} CEX, {} DEX endpoints",
            region.code,
            region.name,
            region.cex.len(),
            region.dex.len()
        );
    }
    if !config.vultr.sshkey_ids.is_empty() {
        println!("SSH key ids: {}", config.vultr.sshkey_ids.join(", "));
    }
    println!(
        "Public key injection: {}",
        if config.ssh.public_key.is_some() { "yes" } else { "no" }
    );
    println!(
        "Teardown: {}",
        if config.keep() { "keep instances" } else { "destroy" }
    );
}

/// Run a full session against the real provider and hosts
pub async fn run_session(config: RunConfig) -> Result<()> {
    let catalog = Catalog::default_catalog()
        .select(config.regions())
        .context("Invalid region selection")?;

    if config.dry_run() {
        print_plan(&catalog, &config);
        return Ok(());
    }

    let probe_binary = find_probe_binary(config.session.probe_binary.as_deref())
        .context("Build it with `cargo build --release -p vultr-latency-probe` or set LATENCY_PROBE_BINARY")?;
    info!(path = %probe_binary.display(), "Using probe binary");

    let user_data = user_data::generate_user_data(config.ssh.public_key.as_deref())?;
    let client = VultrClient::with_base_url(&config.vultr.api_key, &config.vultr.api_base_url)?;
    let deployer = Deployer::new(
        client,
        LaunchTemplate {
            plan: config.vultr.plan.clone(),
            os_id: config.vultr.os_id,
            sshkey_ids: config.vultr.sshkey_ids.clone(),
            user_data,
        },
    );
    let prober = SshProber::new(config.ssh.clone(), probe_binary);

    let cancel = CancellationToken::new();
    tokio::spawn(handle_interrupts(
        || async { tokio::signal::ctrl_c().await.is_ok() },
        cancel.clone(),
        || {
            std::process::exit(130);
        },
    ));

    let options = SessionOptions::from_config(&config);
    info!(session = %options.session_id, regions = ?config.regions(), "Starting session");

    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut session = Session::new(&catalog, deployer, prober, options);
    let outcome = session.run(&mut stdin, &cancel).await;

    if let Some(report) = &outcome.teardown_report {
        if !report.is_clean() {
            anyhow::bail!(
                "{} instance(s) could not be destroyed, delete them manually",
                report.failed.len()
            );
        }
    }

    println!("\nTest finished.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Signal source delivering `available` signals, then reporting none left
    fn signals(available: usize) -> impl FnMut() -> std::future::Ready<bool> {
        let mut delivered = 0;
        move || {
            delivered += 1;
            std::future::ready(delivered <= available)
        }
    }

    async fn interrupts(available: usize) -> (bool, usize) {
        let cancel = CancellationToken::new();
        let quits = Arc::new(AtomicUsize::new(0));
        let counter = quits.clone();
        handle_interrupts(signals(available), cancel.clone(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await;
        (cancel.is_cancelled(), quits.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn test_no_interrupt_leaves_session_alone() {
        assert_eq!(interrupts(0).await, (false, 0));
    }

    #[tokio::test]
    async fn test_first_interrupt_cancels_without_quitting() {
        assert_eq!(interrupts(1).await, (true, 0));
    }

    #[tokio::test]
    async fn test_second_interrupt_forces_quit() {
        assert_eq!(interrupts(2).await, (true, 1));
    }
}

//! HTTP latency sampling
//!
//! Each round issues one GET per endpoint, all endpoints concurrently, then
//! sleeps for the configured interval. A sample is the time from sending the
//! request until the whole body has been read. Requests that fail or exceed
//! the timeout are discarded; an endpoint without any successful sample is
//! left out of the report.

use std::collections::BTreeMap;
use std::time::Instant;

use anyhow::{Context, Result};
use futures::future::join_all;
use reqwest::Client;
use tracing::{debug, info};
use vultr_latency_common::{LatencyStats, ProbeReport, ProbeStats};

use crate::config::ProbeSettings;

/// Build the HTTP client used for sampling
pub fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(concat!("vultr-latency-probe/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

/// Time a single GET request, returning milliseconds or `None` on failure
pub async fn time_request(client: &Client, url: &str, settings: &ProbeSettings) -> Option<f64> {
    let start = Instant::now();
    let request = async {
        let response = client.get(url).send().await?;
        response.bytes().await
    };

    match tokio::time::timeout(settings.request_timeout, request).await {
        Ok(Ok(_)) => Some(start.elapsed().as_secs_f64() * 1000.0),
        Ok(Err(e)) => {
            debug!(url = %url, error = %e, "Request failed");
            None
        }
        Err(_) => {
            debug!(
                url = %url,
                timeout_ms = settings.request_timeout.as_millis(),
                "Request timed out"
            );
            None
        }
    }
}

/// Collect raw samples for every endpoint
pub async fn collect_samples(
    client: &Client,
    endpoints: &BTreeMap<String, String>,
    settings: &ProbeSettings,
) -> BTreeMap<String, Vec<f64>> {
    let mut samples: BTreeMap<String, Vec<f64>> = endpoints
        .keys()
        .map(|name| (name.clone(), Vec::with_capacity(settings.samples as usize)))
        .collect();

    for round in 1..=settings.samples {
        let results = join_all(
            endpoints
                .iter()
                .map(|(name, url)| async move { (name, time_request(client, url, settings).await) }),
        )
        .await;

        for (name, latency) in results {
            if let (Some(ms), Some(list)) = (latency, samples.get_mut(name)) {
                list.push(ms);
            }
        }
        debug!(round, total = settings.samples, "Sample round complete");

        tokio::time::sleep(settings.interval).await;
    }

    samples
}

/// Reduce raw samples to the report printed by the probe
pub fn summarize(samples: &BTreeMap<String, Vec<f64>>) -> ProbeReport {
    samples
        .iter()
        .filter_map(|(name, values)| {
            ProbeStats::from_latency(&LatencyStats::from_samples(values))
                .map(|stats| (name.clone(), stats))
        })
        .collect()
}

/// Sample all endpoints and build the report
pub async fn run_probe(
    client: &Client,
    endpoints: &BTreeMap<String, String>,
    settings: &ProbeSettings,
) -> ProbeReport {
    info!(
        endpoints = endpoints.len(),
        samples = settings.samples,
        interval_ms = settings.interval.as_millis(),
        "Probing endpoints"
    );

    let samples = collect_samples(client, endpoints, settings).await;
    let report = summarize(&samples);

    info!(
        reachable = report.len(),
        unreachable = endpoints.len() - report.len(),
        "Probe complete"
    );
    report
}

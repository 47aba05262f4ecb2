//! vultr-latency-probe: latency probe that runs on measurement instances
//!
//! Reads the endpoint mapping uploaded by the coordinator, samples every
//! endpoint and prints the JSON report on stdout. Logs go to stderr so the
//! coordinator can parse stdout directly.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use vultr_latency_common::defaults::{
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_SAMPLES, DEFAULT_SAMPLE_INTERVAL_MS, REMOTE_ENDPOINTS_PATH,
};
use vultr_latency_probe::config::{load_endpoints, ProbeSettings};
use vultr_latency_probe::probe::{build_client, run_probe};

#[derive(Parser, Debug)]
#[command(name = "vultr-latency-probe")]
#[command(about = "Measure HTTP round-trip latency to a set of endpoints")]
#[command(version)]
struct Args {
    /// JSON file mapping endpoint name to URL
    #[arg(long, default_value = REMOTE_ENDPOINTS_PATH)]
    endpoints: PathBuf,

    /// Requests per endpoint
    #[arg(long, default_value_t = DEFAULT_SAMPLES)]
    samples: u32,

    /// Pause between sample rounds in milliseconds
    #[arg(long, default_value_t = DEFAULT_SAMPLE_INTERVAL_MS)]
    interval_ms: u64,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_MS)]
    timeout_ms: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // stdout carries the report, keep logs on stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    info!(
        endpoints = %args.endpoints.display(),
        samples = args.samples,
        version = env!("CARGO_PKG_VERSION"),
        "Starting vultr-latency-probe"
    );

    let endpoints = load_endpoints(&args.endpoints)?;
    let settings = ProbeSettings {
        samples: args.samples,
        interval: Duration::from_millis(args.interval_ms),
        request_timeout: Duration::from_millis(args.timeout_ms),
    };

    let client = build_client()?;
    let report = run_probe(&client, &endpoints, &settings).await;

    println!("{}", report.to_json_pretty()?);
    Ok(())
}

//! vultr-latency: measure exchange API latency from several Vultr regions
//!
//! Provisions one short-lived instance per region, probes the configured CEX
//! and DEX endpoints from each, reports the results and tears the instances down.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, ContentArrangement, Table};
use tracing::info;
use tracing_subscriber::prelude::*;
use vultr_latency_common::defaults::{
    DEFAULT_API_BASE_URL, DEFAULT_OS_ID, DEFAULT_PASS_INTERVAL_SECS, DEFAULT_PLAN,
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_PROBE_TIMEOUT_SECS, DEFAULT_READY_TIMEOUT_SECS,
    DEFAULT_SHELL_RETRIES, DEFAULT_SHELL_RETRY_DELAY_SECS, DEFAULT_SSH_CONNECT_TIMEOUT_SECS,
    DEFAULT_TEARDOWN_PROMPT_SECS, DEFAULT_TOP_N,
};
use vultr_latency_common::Catalog;
use vultr_latency_coordinator::vultr::VultrClient;
use vultr_latency_coordinator::{config, orchestrator};

/// Log file written next to the working directory with `--log-file`
const LOG_FILE_NAME: &str = "vultr-latency.log";

#[derive(Parser, Debug)]
#[command(name = "vultr-latency")]
#[command(about = "Measure exchange API latency from multiple Vultr regions")]
#[command(version)]
struct Args {
    /// Also write logs to vultr-latency.log
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

/// Provider credentials shared by the commands that call the API
#[derive(clap::Args, Debug)]
struct ApiArgs {
    /// Vultr API key
    #[arg(long, env = "VULTR_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Vultr API base URL
    #[arg(long, env = "VULTR_API_URL", default_value = DEFAULT_API_BASE_URL)]
    api_url: String,
}

/// Arguments for the run command (extracted to reduce enum size)
#[derive(clap::Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    api: ApiArgs,

    /// Comma-separated catalog region codes (default: every catalog region)
    #[arg(long, value_delimiter = ',')]
    regions: Vec<String>,

    /// Test duration answer (0, 1, 5, 15, 60, 1h); prompts when omitted
    #[arg(long)]
    duration: Option<String>,

    /// Don't destroy instances at the end
    #[arg(long)]
    keep: bool,

    /// Print the plan without creating anything
    #[arg(long)]
    dry_run: bool,

    /// Directory for the CSV export
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Instance plan
    #[arg(long, default_value = DEFAULT_PLAN)]
    plan: String,

    /// Operating system id
    #[arg(long, default_value_t = DEFAULT_OS_ID)]
    os_id: u32,

    /// API-registered SSH key id to attach
    #[arg(long, env = "VULTR_SSH_KEY_ID")]
    ssh_key_id: Option<String>,

    /// Comma-separated API-registered SSH key ids (takes precedence)
    #[arg(long, env = "VULTR_SSH_KEY_IDS")]
    ssh_key_ids: Option<String>,

    /// Private key for ssh/scp
    #[arg(long, env = "SSH_KEY_PATH")]
    ssh_key_path: Option<PathBuf>,

    /// Public key injected through user-data
    #[arg(long, env = "SSH_PUBLIC_KEY")]
    ssh_public_key: Option<String>,

    /// File holding the public key to inject
    #[arg(long, env = "SSH_PUBLIC_KEY_PATH")]
    ssh_public_key_path: Option<PathBuf>,

    /// SSH connect timeout in seconds
    #[arg(long, env = "SSH_CONNECT_TIMEOUT", default_value_t = DEFAULT_SSH_CONNECT_TIMEOUT_SECS)]
    ssh_connect_timeout: u64,

    /// Probe binary to upload (default: search target/)
    #[arg(long, env = "LATENCY_PROBE_BINARY")]
    probe_binary: Option<PathBuf>,

    /// Seconds to wait for instances to become ready
    #[arg(long, default_value_t = DEFAULT_READY_TIMEOUT_SECS)]
    ready_timeout: u64,

    /// Rows in the lowest-latency ranking
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    top: usize,
}

impl RunArgs {
    fn into_config(self) -> Result<config::RunConfig, config::ConfigError> {
        let api_key = config::require_api_key(self.api.api_key.as_deref())?;
        let public_key = config::resolve_public_key(
            self.ssh_public_key.as_deref(),
            self.ssh_public_key_path.as_deref(),
        )?;
        let regions = if self.regions.is_empty() {
            Catalog::default_catalog()
                .codes()
                .into_iter()
                .map(String::from)
                .collect()
        } else {
            self.regions
                .iter()
                .map(|r| r.trim().to_lowercase())
                .filter(|r| !r.is_empty())
                .collect()
        };

        Ok(config::RunConfig {
            vultr: config::VultrConfig {
                api_key,
                api_base_url: self.api.api_url,
                plan: self.plan,
                os_id: self.os_id,
                sshkey_ids: config::parse_ssh_key_ids(
                    self.ssh_key_ids.as_deref(),
                    self.ssh_key_id.as_deref(),
                ),
            },
            ssh: config::SshConfig {
                ssh_program: "ssh".to_string(),
                scp_program: "scp".to_string(),
                key_path: self.ssh_key_path,
                public_key,
                connect_timeout_secs: self.ssh_connect_timeout,
                shell_retries: DEFAULT_SHELL_RETRIES,
                shell_retry_delay: Duration::from_secs(DEFAULT_SHELL_RETRY_DELAY_SECS),
                probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            },
            session: config::SessionConfig {
                regions,
                duration: self.duration,
                ready_timeout: Duration::from_secs(self.ready_timeout),
                poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
                pass_interval: Duration::from_secs(DEFAULT_PASS_INTERVAL_SECS),
                teardown_prompt: Duration::from_secs(DEFAULT_TEARDOWN_PROMPT_SECS),
                top_n: self.top,
                output_dir: self.output_dir,
                probe_binary: self.probe_binary,
            },
            flags: config::RuntimeFlags {
                keep: self.keep,
                dry_run: self.dry_run,
            },
        })
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deploy, measure, report and tear down
    Run(Box<RunArgs>),

    /// List the regions offered by the provider
    Regions {
        #[command(flatten)]
        api: ApiArgs,
    },

    /// Show the built-in region and endpoint catalog
    Catalog,
}

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            print_error(&e);
            1
        }
    };
    // Exit explicitly: an unanswered prompt leaves a blocking stdin read behind
    std::process::exit(code);
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if let Some(hint) = e
        .chain()
        .find_map(|c| c.downcast_ref::<vultr_latency_coordinator::vultr::VultrError>())
        .and_then(|v| v.suggestion())
    {
        let _ = writeln!(stderr, "\n\x1b[2mHint: {hint}\x1b[0m");
    }
}

fn init_tracing(log_file: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let file_layer = if log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(LOG_FILE_NAME)
            .with_context(|| format!("Failed to open {LOG_FILE_NAME}"))?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file)),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

async fn run() -> Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_tracing(args.log_file)?;

    match args.command {
        Command::Run(run_args) => {
            let config = run_args.into_config()?;
            info!(
                regions = ?config.regions(),
                plan = %config.vultr.plan,
                keep = config.keep(),
                dry_run = config.dry_run(),
                "Starting latency session"
            );
            orchestrator::run_session(config).await?;
        }

        Command::Regions { api } => {
            handle_regions(api).await?;
        }

        Command::Catalog => {
            print_catalog(&Catalog::default_catalog());
        }
    }

    Ok(())
}

/// Handle the regions command
async fn handle_regions(api: ApiArgs) -> Result<()> {
    let api_key = config::require_api_key(api.api_key.as_deref())?;
    let client = VultrClient::with_base_url(api_key, api.api_url)?;
    let regions = client
        .list_regions()
        .await
        .context("Failed to list provider regions")?;

    let catalog = Catalog::default_catalog();
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "City", "Country", "Continent", "In catalog"]);

    for region in &regions {
        let in_catalog = if catalog.get(&region.id).is_some() { "yes" } else { "" };
        table.add_row(vec![
            Cell::new(&region.id),
            Cell::new(&region.city),
            Cell::new(&region.country),
            Cell::new(&region.continent),
            Cell::new(in_catalog),
        ]);
    }

    println!("{table}");
    println!("\nTotal: {} regions", regions.len());
    Ok(())
}

fn print_catalog(catalog: &Catalog) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Region", "Name", "Type", "Exchange", "URL"]);

    for region in catalog.regions() {
        let rows = region
            .cex
            .iter()
            .map(|e| ("CEX", e))
            .chain(region.dex.iter().map(|e| ("DEX", e)));
        for (kind, endpoint) in rows {
            table.add_row(vec![
                Cell::new(&region.code),
                Cell::new(&region.name),
                Cell::new(kind),
                Cell::new(&endpoint.name),
                Cell::new(&endpoint.url),
            ]);
        }
    }

    println!("{table}");
}
